use std::{path::PathBuf, process::Stdio};

use chrono::Utc;
use futures::future::BoxFuture;
use log::{debug, info};
use tokio::{io::AsyncWriteExt, process::Command};
use uuid::Uuid;

use crate::{
    config::{MailConfig, MailTransport},
    errors::MyError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sender identity stamped on every outgoing message.
#[derive(Debug, Clone)]
pub struct Sender {
    pub address: String,
    pub name: String,
}

impl OutgoingMail {
    /// Hand-built RFC 5322 message with a single UTF-8 text part.
    pub fn build_message(&self, sender: &Sender) -> String {
        let domain = sender
            .address
            .split_once('@')
            .map(|(_, d)| d)
            .unwrap_or("localhost");
        let headers = [
            format!("From: {}", format_mailbox(&sender.name, &sender.address)),
            format!("Reply-To: {}", sender.address),
            format!("To: {}", strip_line_breaks(&self.to)),
            format!("Subject: {}", encode_header(&self.subject)),
            format!("Date: {}", Utc::now().to_rfc2822()),
            format!("Message-ID: <{}@{}>", Uuid::new_v4().simple(), domain),
            "MIME-Version: 1.0".to_string(),
            "Content-Type: text/plain; charset=UTF-8".to_string(),
            "Content-Transfer-Encoding: 8bit".to_string(),
        ];
        let body = self.body.replace("\r\n", "\n").replace('\n', "\r\n");
        format!("{}\r\n\r\n{}\r\n", headers.join("\r\n"), body)
    }
}

fn strip_line_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn is_printable_ascii(value: &str) -> bool {
    value.bytes().all(|b| (0x20..0x7f).contains(&b))
}

/// Longest encoded word RFC 2047 allows, wrapper included.
const MAX_ENCODED_WORD: usize = 75;
const WORD_PREFIX: &str = "=?UTF-8?Q?";
const WORD_SUFFIX: &str = "?=";

/// RFC 2047 Q-encoding for header values that are not plain printable ASCII.
/// Long values are split into several encoded words on character boundaries
/// and folded onto continuation lines.
pub fn encode_header(value: &str) -> String {
    let value = strip_line_breaks(value);
    if is_printable_ascii(&value) {
        return value;
    }
    let max_payload = MAX_ENCODED_WORD - WORD_PREFIX.len() - WORD_SUFFIX.len();
    let mut words = Vec::new();
    let mut payload = String::new();
    let mut buf = [0u8; 4];
    for ch in value.chars() {
        let mut chunk = String::new();
        for &byte in ch.encode_utf8(&mut buf).as_bytes() {
            match byte {
                b' ' => chunk.push('_'),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'!' => chunk.push(byte as char),
                _ => chunk.push_str(&format!("={byte:02X}")),
            }
        }
        if payload.len() + chunk.len() > max_payload {
            words.push(format!("{WORD_PREFIX}{payload}{WORD_SUFFIX}"));
            payload.clear();
        }
        payload.push_str(&chunk);
    }
    words.push(format!("{WORD_PREFIX}{payload}{WORD_SUFFIX}"));
    words.join("\r\n ")
}

/// `name <address>` with the display name quoted when it holds RFC 5322 specials.
pub fn format_mailbox(name: &str, address: &str) -> String {
    let name = strip_line_breaks(name);
    let name = name.trim();
    if name.is_empty() {
        return format!("<{address}>");
    }
    let display = if !is_printable_ascii(name) {
        encode_header(name)
    } else if name.contains(|c: char| "()<>[]:;@\\,.\"".contains(c)) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    };
    format!("{display} <{address}>")
}

/// Phrases that push messages into spam folders, with their neutral rewording.
const SPAM_TRIGGERS: [(&str, &str); 10] = [
    ("click here", "use the link"),
    ("act now", "respond soon"),
    ("limited time", "for a set period"),
    ("free of charge", "at no cost"),
    ("free", "at no cost"),
    ("100%", "fully"),
    ("guaranteed", "assured"),
    ("urgent", "important"),
    ("winner", "selected participant"),
    ("cash", "payment"),
];

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rewords spam-trigger phrases case-insensitively on word boundaries and collapses
/// repeated exclamation marks. Replacements are not rescanned. Tokens that look like
/// links or addresses are copied untouched.
pub fn sanitize_spam_triggers(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    'scan: while i < text.len() {
        if i == 0 || bytes[i - 1].is_ascii_whitespace() {
            let end = lower[i..]
                .find(|c: char| c.is_ascii_whitespace())
                .map_or(text.len(), |n| i + n);
            let token = &text[i..end];
            if token.contains("://") || token.contains('@') {
                out.push_str(token);
                i = end;
                continue;
            }
        }
        let starts_word = i == 0 || !is_word_byte(bytes[i - 1]);
        if starts_word {
            for (phrase, replacement) in SPAM_TRIGGERS {
                let end = i + phrase.len();
                if lower[i..].starts_with(phrase) && (end == bytes.len() || !is_word_byte(bytes[end])) {
                    if text.as_bytes()[i].is_ascii_uppercase() {
                        out.push_str(&capitalize(replacement));
                    } else {
                        out.push_str(replacement);
                    }
                    i = end;
                    continue 'scan;
                }
            }
        }
        let ch = match text[i..].chars().next() {
            Some(ch) => ch,
            None => break,
        };
        if ch == '!' && out.ends_with('!') {
            i += 1;
            continue;
        }
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MyError>>;
}

/// Pipes the message to a local `sendmail -t -i`, the way the platform mail function does.
pub struct SendmailMailer {
    pub path: String,
    pub sender: Sender,
}

impl Mailer for SendmailMailer {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MyError>> {
        Box::pin(async move {
            let message = mail.build_message(&self.sender);
            let mut child = Command::new(&self.path)
                .arg("-t")
                .arg("-i")
                .arg("-f")
                .arg(&self.sender.address)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| MyError::mail(format!("cannot start {}: {e}", self.path)))?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(message.as_bytes())
                    .await
                    .map_err(|e| MyError::mail(format!("cannot write message: {e}")))?;
            }
            let output = child
                .wait_with_output()
                .await
                .map_err(|e| MyError::mail(format!("sendmail did not finish: {e}")))?;
            if output.status.success() {
                debug!("sendmail accepted message for {}", mail.to);
                Ok(())
            } else {
                Err(MyError::mail(format!(
                    "sendmail exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )))
            }
        })
    }
}

/// Writes every message as an `.eml` file instead of delivering it.
pub struct OutboxMailer {
    pub dir: PathBuf,
    pub sender: Sender,
}

impl Mailer for OutboxMailer {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MyError>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| MyError::mail(format!("cannot create outbox: {e}")))?;
            let file = self.dir.join(format!(
                "{}-{}.eml",
                Utc::now().format("%Y%m%d%H%M%S"),
                Uuid::new_v4().simple()
            ));
            tokio::fs::write(&file, mail.build_message(&self.sender))
                .await
                .map_err(|e| MyError::mail(format!("cannot write {}: {e}", file.display())))?;
            info!("mail for {} written to {}", mail.to, file.display());
            Ok(())
        })
    }
}

pub fn from_config(config: &MailConfig) -> Box<dyn Mailer> {
    let sender = Sender {
        address: config.from_address.clone(),
        name: config.from_name.clone(),
    };
    match &config.transport {
        MailTransport::Sendmail { path } => Box::new(SendmailMailer { path: path.clone(), sender }),
        MailTransport::Outbox { dir } => Box::new(OutboxMailer { dir: dir.clone(), sender }),
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Keeps sent messages in memory; fails for recipients listed in `reject`.
    #[derive(Default)]
    pub struct MemoryMailer {
        pub sent: Mutex<Vec<OutgoingMail>>,
        pub reject: Vec<String>,
    }

    impl Mailer for MemoryMailer {
        fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MyError>> {
            Box::pin(async move {
                if self.reject.contains(&mail.to) {
                    return Err(MyError::mail("rejected"));
                }
                self.sent.lock().unwrap().push(mail.clone());
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryMailer;
    use super::*;

    fn sender() -> Sender {
        Sender {
            address: "info@training.example".to_string(),
            name: "Training Office".to_string(),
        }
    }

    #[test]
    fn spam_triggers_are_reworded() {
        assert_eq!(
            sanitize_spam_triggers("Click here, entry is FREE!!!"),
            "Use the link, entry is At no cost!"
        );
        assert_eq!(sanitize_spam_triggers("free of charge"), "at no cost");
    }

    #[test]
    fn spam_triggers_respect_word_boundaries() {
        assert_eq!(sanitize_spam_triggers("freedom and cashew"), "freedom and cashew");
        assert_eq!(sanitize_spam_triggers("100% sure"), "fully sure");
    }

    #[test]
    fn sanitizing_keeps_non_ascii_text() {
        assert_eq!(sanitize_spam_triggers("Prijs: €199 - urgent"), "Prijs: €199 - important");
    }

    #[test]
    fn links_and_addresses_are_not_reworded() {
        let text = "Download: https://free-training.example/portal?key=abc\nEmail: cash.flow@acme.nl";
        assert_eq!(sanitize_spam_triggers(text), text);
        assert_eq!(
            sanitize_spam_triggers("Click here: https://free.example"),
            "Use the link: https://free.example"
        );
        assert_eq!(sanitize_spam_triggers("free (info@free.nl)"), "at no cost (info@free.nl)");
    }

    #[test]
    fn ascii_headers_are_left_alone() {
        assert_eq!(encode_header("Enrollment confirmation"), "Enrollment confirmation");
    }

    #[test]
    fn non_ascii_headers_are_q_encoded() {
        assert_eq!(encode_header("Cursus €"), "=?UTF-8?Q?Cursus_=E2=82=AC?=");
    }

    #[test]
    fn long_headers_split_into_short_encoded_words() {
        let subject = "Bevestiging van uw inschrijving voor de cursus Bedrijfshulpverlening € herhaling in Zwolle";
        let encoded = encode_header(subject);
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        for word in &words {
            assert!(word.len() <= 75, "{word} is {} chars", word.len());
            assert!(word.starts_with("=?UTF-8?Q?") && word.ends_with("?="));
        }
        // the euro sign is never split across words
        assert_eq!(encoded.matches("=E2=82=AC").count(), 1);
    }

    #[test]
    fn display_names_with_specials_are_quoted() {
        assert_eq!(
            format_mailbox("Opleidingen, Zwolle", "info@training.example"),
            "\"Opleidingen, Zwolle\" <info@training.example>"
        );
        assert_eq!(
            format_mailbox("The \"Best\" Office", "info@training.example"),
            "\"The \\\"Best\\\" Office\" <info@training.example>"
        );
        assert_eq!(format_mailbox("Training Office", "a@b.nl"), "Training Office <a@b.nl>");
        assert_eq!(format_mailbox("Scholing €", "a@b.nl"), "=?UTF-8?Q?Scholing_=E2=82=AC?= <a@b.nl>");
    }

    #[test]
    fn message_has_headers_and_crlf_body() {
        let mail = OutgoingMail {
            to: "anna@example.com\r\nBcc: evil@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "line one\nline two".to_string(),
        };
        let message = mail.build_message(&sender());
        assert!(message.starts_with("From: Training Office <info@training.example>\r\n"));
        assert!(message.contains("To: anna@example.com  Bcc: evil@example.com\r\n"));
        assert!(!message.contains("\r\nBcc:"));
        assert!(message.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(message.contains("@training.example>\r\n"));
        assert!(message.ends_with("\r\n\r\nline one\r\nline two\r\n"));
    }

    #[actix_web::test]
    async fn outbox_mailer_writes_eml_file() {
        let dir = std::env::temp_dir().join(format!("outbox-{}", Uuid::new_v4().simple()));
        let mailer = OutboxMailer { dir: dir.clone(), sender: sender() };
        let mail = OutgoingMail {
            to: "anna@example.com".into(),
            subject: "Hi".into(),
            body: "Body".into(),
        };
        mailer.send(&mail).await.unwrap();
        let mut entries = std::fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("eml"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Subject: Hi\r\n"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[actix_web::test]
    async fn memory_mailer_rejects_listed_recipients() {
        let mailer = MemoryMailer {
            reject: vec!["bounce@example.com".into()],
            ..Default::default()
        };
        let ok = OutgoingMail { to: "a@example.com".into(), subject: "s".into(), body: "b".into() };
        let bad = OutgoingMail { to: "bounce@example.com".into(), ..ok.clone() };
        assert!(mailer.send(&ok).await.is_ok());
        assert!(mailer.send(&bad).await.is_err());
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }
}
