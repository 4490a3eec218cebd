use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::value::Sender;

/// Per-recipient or global personalization values.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Recipient as accepted from callers: a bare address or an address with fields.
///
/// Resolve it with [`Recipient::normalize`] before use; nothing downstream looks at
/// the variant.
pub enum Recipient {
    Address(String),
    WithFields {
        email: String,
        fields: Option<Fields>,
    },
}

impl Recipient {
    /// Recipient with personalization fields.
    pub fn with_fields(email: impl Into<String>, fields: Fields) -> Self {
        Self::WithFields {
            email: email.into(),
            fields: Some(fields),
        }
    }

    /// Resolve into the canonical shape. Absent and empty `fields` both become `{}`.
    pub fn normalize(self) -> NormalizedRecipient {
        match self {
            Self::Address(email) => NormalizedRecipient {
                email,
                fields: Fields::new(),
            },
            Self::WithFields { email, fields } => NormalizedRecipient {
                email,
                fields: fields.unwrap_or_default(),
            },
        }
    }
}

impl From<&str> for Recipient {
    fn from(value: &str) -> Self {
        Self::Address(value.to_owned())
    }
}

impl From<String> for Recipient {
    fn from(value: String) -> Self {
        Self::Address(value)
    }
}

impl From<NormalizedRecipient> for Recipient {
    fn from(value: NormalizedRecipient) -> Self {
        Self::WithFields {
            email: value.email,
            fields: Some(value.fields),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Canonical recipient: `fields` is always present.
pub struct NormalizedRecipient {
    pub email: String,
    pub fields: Fields,
}

/// Normalize one recipient. See [`Recipient::normalize`].
pub fn normalize(recipient: impl Into<Recipient>) -> NormalizedRecipient {
    recipient.into().normalize()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Optional per-call settings. Unset fields are defaulted once, when the request is built.
pub struct SendOptions {
    pub scheduled_time: Option<DateTime<Utc>>,
    pub global_fields: Option<Fields>,
    pub attachments: Option<Vec<Attachment>>,
}

impl SendOptions {
    pub fn scheduled_at(mut self, time: DateTime<Utc>) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    pub fn global_fields(mut self, fields: Fields) -> Self {
        self.global_fields = Some(fields);
        self
    }

    pub fn global_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_fields
            .get_or_insert_with(Fields::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments
            .get_or_insert_with(Vec::new)
            .push(attachment);
        self
    }

    fn resolve(self, now: DateTime<Utc>) -> (DateTime<Utc>, Fields, Vec<Attachment>) {
        (
            self.scheduled_time.unwrap_or(now),
            self.global_fields.unwrap_or_default(),
            self.attachments.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Which body a send carries: inline HTML or a server-side template id.
pub enum Content {
    Html(String),
    Template(String),
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Html(_) => "html",
            Self::Template(_) => "template",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Fully-defaulted send request, built fresh for every call.
pub struct SendRequest {
    sender: Sender,
    subject: String,
    content: Content,
    recipients: Vec<NormalizedRecipient>,
    scheduled_time: DateTime<Utc>,
    attachments: Vec<Attachment>,
    global_fields: Fields,
}

impl SendRequest {
    /// Build a request, defaulting an unset scheduled time to the current instant.
    pub fn build<I, R>(
        content: Content,
        recipients: I,
        subject: impl Into<String>,
        sender: &Sender,
        options: SendOptions,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Recipient>,
    {
        Self::build_at(content, recipients, subject, sender, options, Utc::now())
    }

    /// Like [`SendRequest::build`], with `now` supplied by the caller.
    pub fn build_at<I, R>(
        content: Content,
        recipients: I,
        subject: impl Into<String>,
        sender: &Sender,
        options: SendOptions,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Recipient>,
    {
        let (scheduled_time, global_fields, attachments) = options.resolve(now);
        Self {
            sender: sender.clone(),
            subject: subject.into(),
            content,
            recipients: recipients.into_iter().map(normalize).collect(),
            scheduled_time,
            attachments,
            global_fields,
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn recipients(&self) -> &[NormalizedRecipient] {
        &self.recipients
    }

    pub fn scheduled_time(&self) -> DateTime<Utc> {
        self.scheduled_time
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn global_fields(&self) -> &Fields {
        &self.global_fields
    }

    /// Take the request apart for wire encoding.
    pub(crate) fn into_parts(self) -> SendRequestParts {
        SendRequestParts {
            sender: self.sender,
            subject: self.subject,
            content: self.content,
            recipients: self.recipients,
            scheduled_time: self.scheduled_time,
            attachments: self.attachments,
            global_fields: self.global_fields,
        }
    }
}

pub(crate) struct SendRequestParts {
    pub sender: Sender,
    pub subject: String,
    pub content: Content,
    pub recipients: Vec<NormalizedRecipient>,
    pub scheduled_time: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub global_fields: Fields,
}
