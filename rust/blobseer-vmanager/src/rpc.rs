use blobseer_metadata::{Interval, ObjectId, TicketReply, Version, VersionRoot};
use blobseer_storage::Encoder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Status, VersionManager, VersionManagerError};

/// A request to the version manager, as it travels over a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Look up a published root; version 0 asks for the latest
    GetRoot {
        /// Object to look up
        object_id: ObjectId,
        /// Version to look up
        version: Version,
    },
    /// Reserve a version for a write
    GetTicket {
        /// Range to write; the version is ignored
        interval: Interval,
        /// Write at the current end of the object instead
        append: bool,
    },
    /// Create a new object
    Create {
        /// Page size of the object
        page_size: u64,
        /// Replication factor of the object
        ft_info: u32,
    },
    /// Report a version's tree as complete
    Publish {
        /// The ticketed range
        interval: Interval,
    },
    /// Count objects
    GetObjectCount,
    /// Clone a published version into a new object
    Clone {
        /// Object to clone
        object_id: ObjectId,
        /// Version to clone; 0 clones the latest
        version: Version,
    },
}

/// The payload of a successful reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// A root, or none if the version is not published
    Root(Option<VersionRoot>),
    /// A newly issued ticket
    Ticket(TicketReply),
    /// The ticket was marked complete
    Published,
    /// The number of objects
    ObjectCount(u32),
}

/// A status together with the payload of a successful request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Outcome of the request
    pub status: Status,
    /// Payload, present only when the status is [`Status::Ok`]
    pub response: Option<Response>,
}

impl Reply {
    fn failed(error: &VersionManagerError) -> Self {
        Reply {
            status: error.status(),
            response: None,
        }
    }
}

impl From<Result<Response, VersionManagerError>> for Reply {
    fn from(value: Result<Response, VersionManagerError>) -> Self {
        match value {
            Ok(response) => Reply {
                status: Status::Ok,
                response: Some(response),
            },
            Err(error) => Reply::failed(&error),
        }
    }
}

impl VersionManager {
    /// Serve one request. Failures are reported through the reply's status.
    pub fn handle(&self, request: Request) -> Reply {
        let result = match request {
            Request::GetRoot { object_id, version } => {
                self.get_root(object_id, version).map(Response::Root)
            }
            Request::GetTicket { interval, append } => {
                self.get_ticket(interval, append).map(Response::Ticket)
            }
            Request::Create { page_size, ft_info } => self
                .create(page_size, ft_info)
                .map(|root| Response::Root(Some(root))),
            Request::Publish { interval } => self.publish(interval).map(|_| Response::Published),
            Request::GetObjectCount => Ok(Response::ObjectCount(self.get_object_count())),
            Request::Clone { object_id, version } => self
                .clone_object(object_id, version)
                .map(|root| Response::Root(Some(root))),
        };

        if let Err(error) = &result {
            warn!("Request failed: {error}");
        }

        result.into()
    }

    /// Serve one encoded request and encode the reply. A payload that does
    /// not decode to a [`Request`] is answered with [`Status::BadArgument`].
    pub async fn handle_encoded<Codec>(
        &self,
        codec: &Codec,
        payload: &[u8],
    ) -> Result<Vec<u8>, VersionManagerError>
    where
        Codec: Encoder,
    {
        let request: Result<Request, _> = codec.decode(payload).await;
        let reply = match request {
            Ok(request) => self.handle(request),
            Err(error) => {
                warn!("Rejected malformed request: {error}");
                Reply::failed(&VersionManagerError::from(error))
            }
        };

        Ok(codec.encode(&reply).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use blobseer_storage::CborEncoder;

    #[test]
    fn it_answers_requests_with_a_status() -> Result<()> {
        let manager = VersionManager::default();

        let reply = manager.handle(Request::Create {
            page_size: 8,
            ft_info: 1,
        });
        assert_eq!(reply.status, Status::Ok);

        let reply = manager.handle(Request::GetTicket {
            interval: Interval::new(1, 0, 0, 24),
            append: false,
        });
        let Some(Response::Ticket(ticket)) = reply.response else {
            anyhow::bail!("expected a ticket, got {:?}", reply.status);
        };
        assert_eq!(ticket.root_size, 32);

        let reply = manager.handle(Request::Publish {
            interval: ticket.interval,
        });
        assert_eq!(reply.response, Some(Response::Published));

        assert_eq!(
            manager.handle(Request::GetObjectCount).response,
            Some(Response::ObjectCount(1))
        );

        Ok(())
    }

    #[test]
    fn it_maps_errors_onto_statuses() {
        let manager = VersionManager::default();

        assert_eq!(
            manager.handle(Request::GetRoot {
                object_id: 9,
                version: 0
            }),
            Reply {
                status: Status::ObjectNotFound,
                response: None
            }
        );
        assert_eq!(
            manager
                .handle(Request::Create {
                    page_size: 0,
                    ft_info: 1
                })
                .status,
            Status::BadArgument
        );
    }

    #[tokio::test]
    async fn it_rejects_malformed_payloads() -> Result<()> {
        let manager = VersionManager::default();
        let codec = CborEncoder;

        let reply: Reply = codec
            .decode(&manager.handle_encoded(&codec, &[0xff, 0x00, 0x13]).await?)
            .await?;
        assert_eq!(reply.status, Status::BadArgument);

        let request = codec
            .encode(&Request::Create {
                page_size: 16,
                ft_info: 1,
            })
            .await?;
        let reply: Reply = codec
            .decode(&manager.handle_encoded(&codec, &request).await?)
            .await?;
        assert_eq!(reply.status, Status::Ok);
        assert!(matches!(
            reply.response,
            Some(Response::Root(Some(root))) if root.object_id == 1 && root.page_size == 16
        ));

        Ok(())
    }
}
