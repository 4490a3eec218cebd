use chrono::{DateTime, Utc};

use crate::domain::{
    Attachment, Content, NormalizedRecipient, SendRequest, SendRequestParts, SendResult, Sender,
};
use crate::transport::proto;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("response is missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("response field {field} holds an invalid timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp {
        field: &'static str,
        seconds: i64,
        nanos: i32,
    },
}

/// Wire payload for one of the two Mailer RPCs.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Html(proto::SendHtmlReq),
    Template(proto::SendTemplateReq),
}

impl WireRequest {
    pub fn rpc_name(&self) -> &'static str {
        match self {
            Self::Html(_) => "SendHTML",
            Self::Template(_) => "SendTemplate",
        }
    }
}

pub fn encode_send_request(request: SendRequest) -> WireRequest {
    let SendRequestParts {
        sender,
        subject,
        content,
        recipients,
        scheduled_time,
        attachments,
        global_fields,
    } = request.into_parts();

    let sender = Some(encode_sender(sender));
    let scheduled_time = Some(encode_timestamp(scheduled_time));
    let recipients = recipients.into_iter().map(encode_recipient).collect();
    let attachments = attachments.into_iter().map(encode_attachment).collect();

    match content {
        Content::Html(html) => WireRequest::Html(proto::SendHtmlReq {
            sender,
            subject,
            html,
            scheduled_time,
            recipients,
            attachments,
            global_fields,
        }),
        Content::Template(template_id) => WireRequest::Template(proto::SendTemplateReq {
            sender,
            subject,
            template_id,
            scheduled_time,
            recipients,
            attachments,
            global_fields,
        }),
    }
}

fn encode_sender(sender: Sender) -> proto::Sender {
    proto::Sender {
        email: sender.email().to_owned(),
        alias: sender.alias().to_owned(),
    }
}

fn encode_recipient(recipient: NormalizedRecipient) -> proto::Recipient {
    proto::Recipient {
        email: recipient.email,
        fields: recipient.fields,
    }
}

fn encode_attachment(attachment: Attachment) -> proto::Attachment {
    proto::Attachment {
        filename: attachment.filename,
        content: attachment.content,
    }
}

const NANOS_PER_SECOND: u32 = 1_000_000_000;

fn encode_timestamp(time: DateTime<Utc>) -> prost_types::Timestamp {
    // chrono represents a leap second as nanos >= 1e9; protobuf requires nanos < 1e9.
    let nanos = time.timestamp_subsec_nanos();
    prost_types::Timestamp {
        seconds: time.timestamp() + i64::from(nanos / NANOS_PER_SECOND),
        nanos: (nanos % NANOS_PER_SECOND) as i32,
    }
}

/// Map a `SendRes` into a [`SendResult`]. An absent `scheduled_time` becomes `now`.
pub fn decode_send_res(response: proto::SendRes) -> Result<SendResult, TransportError> {
    decode_send_res_at(response, Utc::now())
}

fn decode_send_res_at(
    response: proto::SendRes,
    now: DateTime<Utc>,
) -> Result<SendResult, TransportError> {
    if response.message_id.is_empty() {
        return Err(TransportError::MissingField {
            field: "message_id",
        });
    }

    let scheduled_time = match response.scheduled_time {
        Some(ts) => decode_timestamp("scheduled_time", ts)?,
        None => now,
    };

    Ok(SendResult {
        message_id: response.message_id,
        template_id: response.template_id,
        scheduled_time,
    })
}

fn decode_timestamp(
    field: &'static str,
    ts: prost_types::Timestamp,
) -> Result<DateTime<Utc>, TransportError> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
        .ok_or(TransportError::InvalidTimestamp {
            field,
            seconds: ts.seconds,
            nanos: ts.nanos,
        })
}
