use std::fmt;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::{Body, Incoming};

use crate::pool::{Lease, Origin};
use crate::transport::{self, Deadline};
use crate::{ErrorKind, Result};

/// The single-pass body of a response, still attached to its connection.
///
/// The connection lease is released as soon as the body ends. Reading the
/// body to the end returns the connection to the pool; dropping the body
/// early or failing to read it closes the connection.
pub(crate) struct ResponseBody {
    incoming: Incoming,
    lease: Option<Lease>,
    origin: Origin,
    deadline: Option<Deadline>,
}

impl ResponseBody {
    pub(crate) fn new(
        incoming: Incoming,
        lease: Lease,
        origin: Origin,
        deadline: Option<Deadline>,
    ) -> Self {
        let mut body = Self {
            incoming,
            lease: Some(lease),
            origin,
            deadline,
        };
        // Bodiless responses (HEAD, 204, 304) are complete right away
        if body.incoming.is_end_stream() {
            body.finish();
        }
        body
    }

    /// Read the next chunk of data, or `None` once the body ended.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.lease.is_none() {
                return Ok(None);
            }

            let incoming = &mut self.incoming;
            let origin = &self.origin;
            let frame = transport::within(self.deadline, async {
                incoming
                    .frame()
                    .await
                    .transpose()
                    .map_err(|e| ErrorKind::from_hyper(origin, e))
            })
            .await;

            match frame {
                Ok(Some(frame)) => {
                    if let Ok(data) = frame.into_data()
                        && !data.is_empty()
                    {
                        return Ok(Some(data));
                    }
                }
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => {
                    // the connection is in an unknown state, close it
                    self.lease = None;
                    return Err(e);
                }
            }
        }
    }

    fn finish(&mut self) {
        if let Some(mut lease) = self.lease.take() {
            lease.mark_drained();
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("origin", &self.origin)
            .field("finished", &self.lease.is_none())
            .finish_non_exhaustive()
    }
}
