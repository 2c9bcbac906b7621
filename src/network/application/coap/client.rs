use super::{CONTENT_FORMAT_JSON, Code, MAX_MESSAGE_LEN, Message, MessageType};
use crate::network::error::Error;
use crate::network::{Clock, Connection, Read, ReadTimeout};
use core::time::Duration;

/// Confirmable CoAP request client over a datagram-like connection.
///
/// Every [`post`](Client::post) sends one CON request and blocks until the
/// matching response arrives or the deadline passes. Both piggybacked
/// responses (in the ACK) and separate responses (empty ACK, then a CON
/// carrying the response) are accepted.
#[derive(Debug)]
pub struct Client<C: Connection, K: Clock> {
    connection: C,
    clock: K,
    next_message_id: u16,
}

impl<C, K> Client<C, K>
where
    C: Connection + Read<Error = Error> + ReadTimeout,
    K: Clock,
{
    pub fn new(connection: C, clock: K) -> Self {
        Self {
            connection,
            clock,
            next_message_id: 1,
        }
    }

    /// POST a JSON body to `path` and wait up to `timeout` for the response code.
    ///
    /// `timeout` bounds the whole exchange: datagrams that are not the
    /// answer only use up what is left of it.
    pub fn post(&mut self, path: &str, body: &[u8], timeout: Duration) -> Result<Code, Error> {
        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);

        let mut request = Message::new(MessageType::Confirmable, Code::POST, message_id);
        request.set_token(&message_id.to_be_bytes())?;
        request.set_path(path)?;
        request.content_format = Some(CONTENT_FORMAT_JSON);
        request.set_payload(body)?;

        self.send(&request)?;
        let deadline = self.clock.now().saturating_add(timeout);

        let mut buf = [0u8; MAX_MESSAGE_LEN];
        loop {
            let remaining = deadline.saturating_sub(self.clock.now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            self.connection.set_read_timeout(Some(remaining))?;

            let len = match self.connection.read(&mut buf) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => n,
                Err(Error::Timeout) => return Err(Error::Timeout),
                Err(_) => return Err(Error::ReadError),
            };

            let response = match Message::decode(&buf[..len]) {
                Ok(response) => response,
                // Garbage on the wire is not our answer, keep waiting.
                Err(_) => continue,
            };

            match response.kind {
                MessageType::Acknowledgement if response.message_id == message_id => {
                    if response.code == Code::EMPTY {
                        // Separate response follows.
                        continue;
                    }
                    return Ok(response.code);
                }
                MessageType::Reset if response.message_id == message_id => {
                    return Err(Error::ConnectionRefused);
                }
                MessageType::Confirmable | MessageType::NonConfirmable
                    if response.token == request.token =>
                {
                    if response.kind == MessageType::Confirmable {
                        let ack = Message::new(
                            MessageType::Acknowledgement,
                            Code::EMPTY,
                            response.message_id,
                        );
                        self.send(&ack)?;
                    }
                    return Ok(response.code);
                }
                _ => continue,
            }
        }
    }

    fn send(&mut self, message: &Message) -> Result<(), Error> {
        let bytes = message.encode()?;
        self.connection
            .write(&bytes)
            .map_err(|_| Error::WriteError)?;
        self.connection.flush().map_err(|_| Error::WriteError)
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get a mutable reference to the underlying connection
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}
