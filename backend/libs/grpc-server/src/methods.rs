//! Method kind lookup built from encoded file descriptor sets
//!
//! Interceptor chains are split between unary and streaming calls, but a
//! request arriving at the HTTP/2 layer only carries its path
//! (`/package.Service/Method`). The table maps each path to its call kind
//! using the protobuf descriptors of the mounted services.

use std::collections::HashMap;

use prost::Message;
use prost_types::FileDescriptorSet;

use crate::error::Result;

/// Shape of an RPC as declared in its proto definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidiStreaming,
}

impl CallKind {
    fn from_flags(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => CallKind::Unary,
            (true, false) => CallKind::ClientStreaming,
            (false, true) => CallKind::ServerStreaming,
            (true, true) => CallKind::BidiStreaming,
        }
    }

    /// Whether the call goes through the stream interceptor chain
    pub fn is_streaming(self) -> bool {
        !matches!(self, CallKind::Unary)
    }
}

/// Per-call metadata handed to every interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    /// Full method path, e.g. `/todo.TodoService/Login`
    pub method: String,
    pub kind: CallKind,
}

/// Path → call kind table
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    kinds: HashMap<String, CallKind>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every method declared in an encoded `FileDescriptorSet`
    pub fn register_encoded(&mut self, encoded: &[u8]) -> Result<()> {
        let set = FileDescriptorSet::decode(encoded)?;

        for file in set.file {
            let package = file.package.unwrap_or_default();
            for service in file.service {
                let service_name = service.name.unwrap_or_default();
                let qualified = if package.is_empty() {
                    service_name
                } else {
                    format!("{package}.{service_name}")
                };

                for method in service.method {
                    let path = format!("/{}/{}", qualified, method.name.unwrap_or_default());
                    let kind = CallKind::from_flags(
                        method.client_streaming.unwrap_or(false),
                        method.server_streaming.unwrap_or(false),
                    );
                    self.kinds.insert(path, kind);
                }
            }
        }

        Ok(())
    }

    /// Record a single method path
    pub fn insert(&mut self, path: impl Into<String>, kind: CallKind) {
        self.kinds.insert(path.into(), kind);
    }

    /// Kind of `path`; methods missing from the table are treated as unary
    pub fn kind_of(&self, path: &str) -> CallKind {
        self.kinds.get(path).copied().unwrap_or(CallKind::Unary)
    }

    pub fn call_info(&self, path: &str) -> CallInfo {
        CallInfo {
            method: path.to_string(),
            kind: self.kind_of(path),
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};

    fn method(name: &str, client: bool, server: bool) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            client_streaming: Some(client),
            server_streaming: Some(server),
            ..Default::default()
        }
    }

    fn encoded_set() -> Vec<u8> {
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("demo.proto".to_string()),
                package: Some("demo".to_string()),
                service: vec![ServiceDescriptorProto {
                    name: Some("Demo".to_string()),
                    method: vec![
                        method("Get", false, false),
                        method("Upload", true, false),
                        method("Watch", false, true),
                        method("Chat", true, true),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        set.encode_to_vec()
    }

    #[test]
    fn test_register_encoded_classifies_methods() {
        let mut table = MethodTable::new();
        table.register_encoded(&encoded_set()).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.kind_of("/demo.Demo/Get"), CallKind::Unary);
        assert_eq!(table.kind_of("/demo.Demo/Upload"), CallKind::ClientStreaming);
        assert_eq!(table.kind_of("/demo.Demo/Watch"), CallKind::ServerStreaming);
        assert_eq!(table.kind_of("/demo.Demo/Chat"), CallKind::BidiStreaming);
    }

    #[test]
    fn test_unknown_method_is_unary() {
        let table = MethodTable::new();
        let info = table.call_info("/missing.Service/Call");

        assert_eq!(info.kind, CallKind::Unary);
        assert_eq!(info.method, "/missing.Service/Call");
    }

    #[test]
    fn test_health_descriptor_has_streaming_watch() {
        let mut table = MethodTable::new();
        table
            .register_encoded(tonic_health::pb::FILE_DESCRIPTOR_SET)
            .unwrap();

        assert_eq!(table.kind_of("/grpc.health.v1.Health/Check"), CallKind::Unary);
        assert!(table.kind_of("/grpc.health.v1.Health/Watch").is_streaming());
    }

    #[test]
    fn test_garbage_descriptor_is_rejected() {
        let mut table = MethodTable::new();
        assert!(table.register_encoded(&[0xff, 0xff, 0xff]).is_err());
    }
}
