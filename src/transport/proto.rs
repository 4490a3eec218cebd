//! Wire messages and client stub for `pkg.kannon.mailer.apiv1.Mailer`.
//!
//! Field tags follow `kannon/mailer/apiv1/mailerapiv1.proto` and
//! `kannon/mailer/types/send.proto`.

use std::collections::BTreeMap;

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sender {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    pub alias: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Recipient {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Attachment {
    #[prost(string, tag = "1")]
    pub filename: String,
    #[prost(bytes = "vec", tag = "2")]
    pub content: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendHtmlReq {
    #[prost(message, optional, tag = "1")]
    pub sender: Option<Sender>,
    #[prost(string, tag = "3")]
    pub subject: String,
    #[prost(string, tag = "4")]
    pub html: String,
    #[prost(message, optional, tag = "5")]
    pub scheduled_time: Option<prost_types::Timestamp>,
    #[prost(message, repeated, tag = "6")]
    pub recipients: Vec<Recipient>,
    #[prost(message, repeated, tag = "7")]
    pub attachments: Vec<Attachment>,
    #[prost(btree_map = "string, string", tag = "8")]
    pub global_fields: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendTemplateReq {
    #[prost(message, optional, tag = "1")]
    pub sender: Option<Sender>,
    #[prost(string, tag = "3")]
    pub subject: String,
    #[prost(string, tag = "4")]
    pub template_id: String,
    #[prost(message, optional, tag = "5")]
    pub scheduled_time: Option<prost_types::Timestamp>,
    #[prost(message, repeated, tag = "6")]
    pub recipients: Vec<Recipient>,
    #[prost(message, repeated, tag = "7")]
    pub attachments: Vec<Attachment>,
    #[prost(btree_map = "string, string", tag = "8")]
    pub global_fields: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendRes {
    #[prost(string, tag = "1")]
    pub message_id: String,
    #[prost(string, tag = "2")]
    pub template_id: String,
    #[prost(message, optional, tag = "3")]
    pub scheduled_time: Option<prost_types::Timestamp>,
}

const SEND_HTML_PATH: &str = "/pkg.kannon.mailer.apiv1.Mailer/SendHTML";
const SEND_TEMPLATE_PATH: &str = "/pkg.kannon.mailer.apiv1.Mailer/SendTemplate";

/// Unary client for the Mailer service over a shared tonic [`Channel`].
#[derive(Debug, Clone)]
pub struct MailerClient {
    inner: tonic::client::Grpc<Channel>,
}

impl MailerClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn send_html(
        &mut self,
        request: tonic::Request<SendHtmlReq>,
    ) -> Result<tonic::Response<SendRes>, tonic::Status> {
        self.unary(request, SEND_HTML_PATH).await
    }

    pub async fn send_template(
        &mut self,
        request: tonic::Request<SendTemplateReq>,
    ) -> Result<tonic::Response<SendRes>, tonic::Status> {
        self.unary(request, SEND_TEMPLATE_PATH).await
    }

    async fn unary<M>(
        &mut self,
        request: tonic::Request<M>,
        path: &'static str,
    ) -> Result<tonic::Response<SendRes>, tonic::Status>
    where
        M: ::prost::Message + Send + Sync + 'static,
    {
        self.inner.ready().await.map_err(|err| {
            tonic::Status::unavailable(format!("service was not ready: {err}"))
        })?;
        let codec = tonic::codec::ProstCodec::<M, SendRes>::default();
        self.inner
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
    }
}
