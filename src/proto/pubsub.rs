//! Group-messaging frames for the binary subprotocol
//! (`protobuf.webpubsub.azure.v1`).
//!
//! Data payloads travel inside a `google.protobuf.Any`-compatible envelope:
//! a length-prefixed `type_url` string (field 1) and length-prefixed bytes
//! (field 2), which is what downstream decoders expect on the wire.

/// `google.protobuf.Any`-compatible typed envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageData {
    #[prost(oneof = "message_data::Data", tags = "1, 2, 3")]
    pub data: ::core::option::Option<message_data::Data>,
}

pub mod message_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "1")]
        ProtobufData(super::Any),
        #[prost(string, tag = "2")]
        TextData(::prost::alloc::string::String),
        #[prost(bytes, tag = "3")]
        BinaryData(::prost::alloc::vec::Vec<u8>),
    }
}

/// Client → server frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpstreamMessage {
    #[prost(oneof = "upstream_message::Message", tags = "6, 7, 8")]
    pub message: ::core::option::Option<upstream_message::Message>,
}

pub mod upstream_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct JoinGroupMessage {
        #[prost(string, tag = "1")]
        pub group: ::prost::alloc::string::String,
        #[prost(uint64, optional, tag = "2")]
        pub ack_id: ::core::option::Option<u64>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LeaveGroupMessage {
        #[prost(string, tag = "1")]
        pub group: ::prost::alloc::string::String,
        #[prost(uint64, optional, tag = "2")]
        pub ack_id: ::core::option::Option<u64>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PingMessage {}

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "6")]
        JoinGroupMessage(JoinGroupMessage),
        #[prost(message, tag = "7")]
        LeaveGroupMessage(LeaveGroupMessage),
        #[prost(message, tag = "8")]
        PingMessage(PingMessage),
    }
}

/// Server → client frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownstreamMessage {
    #[prost(oneof = "downstream_message::Message", tags = "1, 2, 3, 4")]
    pub message: ::core::option::Option<downstream_message::Message>,
}

pub mod downstream_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AckMessage {
        #[prost(uint64, tag = "1")]
        pub ack_id: u64,
        #[prost(bool, tag = "2")]
        pub success: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DataMessage {
        #[prost(string, tag = "1")]
        pub from: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "2")]
        pub group: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(message, optional, tag = "3")]
        pub data: ::core::option::Option<super::MessageData>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SystemMessage {
        #[prost(oneof = "system_message::Message", tags = "1")]
        pub message: ::core::option::Option<system_message::Message>,
    }

    pub mod system_message {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ConnectedMessage {
            #[prost(string, tag = "1")]
            pub connection_id: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub user_id: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Message {
            #[prost(message, tag = "1")]
            ConnectedMessage(ConnectedMessage),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PongMessage {}

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        AckMessage(AckMessage),
        #[prost(message, tag = "2")]
        DataMessage(DataMessage),
        #[prost(message, tag = "3")]
        SystemMessage(SystemMessage),
        #[prost(message, tag = "4")]
        PongMessage(PongMessage),
    }
}
