//! Scripted in-memory cluster for driving the client without sockets.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use shardlink::{ClusterBuilder, ClusterClient, Connector, Error, Frame, Node, NodeConnection, Result};

/// What a scripted node does with one request.
pub enum Reply {
    /// Answer with this frame.
    Frame(Frame),
    /// Fail the request as if the socket broke.
    Fail,
}

type Handler = dyn Fn(&str, &[String]) -> Reply + Send + Sync;

#[derive(Default)]
struct State {
    requests: Vec<(String, Vec<String>)>,
    unreachable: HashSet<String>,
    connects: usize,
}

/// A fake cluster. Every request is recorded with the name of the node it
/// reached and answered by the handler.
#[derive(Clone)]
pub struct MockCluster {
    handler: Arc<Handler>,
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MockCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCluster").finish_non_exhaustive()
    }
}

impl MockCluster {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &[String]) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Makes connecting to `node` fail.
    pub fn set_unreachable(&self, node: &str) {
        self.state.lock().unwrap().unreachable.insert(node.to_string());
    }

    /// Every request so far as `(node, args)`.
    pub fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests received by `node`, as space-joined command lines.
    pub fn requests_to(&self, node: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|(n, _)| n == node)
            .map(|(_, args)| args.join(" "))
            .collect()
    }

    /// Number of requests whose command line equals `line`, on any node.
    pub fn count(&self, line: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(_, args)| args.join(" ") == line)
            .count()
    }

    /// Number of successful and failed connection attempts.
    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    /// Builds a client over this cluster.
    pub async fn client(&self, nodes: &[&str]) -> ClusterClient {
        ClusterBuilder::new()
            .nodes(nodes.iter().copied())
            .connector(Arc::new(self.clone()))
            .build()
            .await
            .expect("failed to build client")
    }
}

impl Connector for MockCluster {
    fn connect(&self, node: &Node) -> BoxFuture<'static, Result<Arc<dyn NodeConnection>>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        let result = if state.unreachable.contains(node.name()) {
            Err(Error::Connect {
                address: node.name().to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            })
        } else {
            Ok(Arc::new(MockConnection {
                node: node.name().to_string(),
                cluster: self.clone(),
            }) as Arc<dyn NodeConnection>)
        };
        async move { result }.boxed()
    }
}

#[derive(Debug)]
struct MockConnection {
    node: String,
    cluster: MockCluster,
}

impl NodeConnection for MockConnection {
    fn send_pipeline(&self, frames: Vec<Frame>) -> BoxFuture<'_, Result<Vec<Frame>>> {
        let mut replies = Vec::with_capacity(frames.len());
        let mut failed = false;
        for frame in frames {
            let args = args_of(&frame);
            self.cluster
                .state
                .lock()
                .unwrap()
                .requests
                .push((self.node.clone(), args.clone()));
            match (self.cluster.handler)(&self.node, &args) {
                Reply::Frame(reply) => replies.push(reply),
                Reply::Fail => {
                    failed = true;
                    break;
                }
            }
        }
        async move {
            if failed {
                return Err(Error::Io {
                    source: io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"),
                });
            }
            Ok(replies)
        }
        .boxed()
    }
}

fn args_of(frame: &Frame) -> Vec<String> {
    match frame {
        Frame::Array(items) => items
            .iter()
            .map(|item| item.as_text().unwrap_or_default())
            .collect(),
        other => vec![other.as_text().unwrap_or_default()],
    }
}

pub fn bulk(value: &str) -> Frame {
    Frame::BulkString(Some(Bytes::copy_from_slice(value.as_bytes())))
}

pub fn ok() -> Reply {
    Reply::Frame(Frame::SimpleString(b"OK".to_vec()))
}

pub fn error(text: &str) -> Reply {
    Reply::Frame(Frame::Error(text.as_bytes().to_vec()))
}

/// A CLUSTER SLOTS reply from `(start, end, ip, port)` ranges.
pub fn slots_reply(ranges: &[(i64, i64, &str, i64)]) -> Reply {
    Reply::Frame(Frame::Array(
        ranges
            .iter()
            .map(|(start, end, ip, port)| {
                Frame::Array(vec![
                    Frame::Integer(*start),
                    Frame::Integer(*end),
                    Frame::Array(vec![bulk(ip), Frame::Integer(*port)]),
                ])
            })
            .collect(),
    ))
}

/// The two-master layout: 0-8191 on 10.0.0.1:7000, 8192-16383 on 10.0.0.2:7000.
pub fn two_masters() -> Reply {
    slots_reply(&[
        (0, 8191, "10.0.0.1", 7000),
        (8192, 16383, "10.0.0.2", 7000),
    ])
}

pub fn is_cluster_slots(args: &[String]) -> bool {
    args.len() == 2 && args[0] == "CLUSTER" && args[1] == "SLOTS"
}
