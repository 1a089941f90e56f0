//! XMLRPC transports: HTTP(S) with basic auth, and SCGI over a unix socket
//! for socket-mounted rtorrent instances.

use std::io::{Cursor, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use xmlrpc::{Request, Transport};

/// HTTP transport backed by a shared blocking reqwest client.
#[derive(Clone, Debug)]
pub(crate) struct HttpTransport {
    pub(crate) client: reqwest::blocking::Client,
    pub(crate) url: String,
    pub(crate) auth: Option<(String, String)>,
}

impl Transport for HttpTransport {
    type Stream = reqwest::blocking::Response;

    fn transmit(
        self,
        request: &Request<'_>,
    ) -> Result<Self::Stream, Box<dyn std::error::Error + Send + Sync>> {
        let mut body = Vec::new();
        // Writing into a Vec cannot fail.
        request.write_as_xml(&mut body)?;

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body);
        if let Some((username, password)) = &self.auth {
            builder = builder.basic_auth(username, Some(password));
        }
        let response = builder.send()?.error_for_status()?;
        Ok(response)
    }
}

/// SCGI transport speaking rtorrent's netstring-framed protocol over a unix
/// socket.
#[derive(Clone, Debug)]
pub(crate) struct ScgiTransport {
    pub(crate) socket: PathBuf,
}

impl ScgiTransport {
    pub(crate) fn scgi_headers(size: usize) -> String {
        let headers = [
            ("CONTENT_LENGTH", size.to_string()),
            ("SCGI", "1".to_string()),
            ("REQUEST_METHOD", "POST".to_string()),
            ("SERVER_PROTOCOL", "HTTP/1.1".to_string()),
        ]
        .into_iter()
        .map(|(key, value)| format!("{key}\0{value}\0"))
        .collect::<Vec<String>>()
        .join("");
        format!("{}:{headers},", headers.len())
    }

    fn process_body(
        &self,
        body: &[u8],
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let mut stream = UnixStream::connect(&self.socket)?;
        stream.write_all(Self::scgi_headers(body.len()).as_bytes())?;
        stream.write_all(body)?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response)?;

        // The XMLRPC payload starts after the blank line ending the headers.
        let header_cut = response
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|idx| idx + 4)
            .ok_or("scgi response missing header terminator")?;
        response.drain(..header_cut);
        Ok(response)
    }
}

impl Transport for ScgiTransport {
    type Stream = Cursor<Vec<u8>>;

    fn transmit(
        self,
        request: &Request<'_>,
    ) -> Result<Self::Stream, Box<dyn std::error::Error + Send + Sync>> {
        let mut body = Vec::new();
        request.write_as_xml(&mut body)?;
        let response = self.process_body(&body)?;
        Ok(Cursor::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scgi_headers_are_netstring_framed() {
        let framed = ScgiTransport::scgi_headers(42);
        let (length, rest) = framed.split_once(':').expect("length prefix");
        let headers = rest.strip_suffix(',').expect("trailing comma");
        assert_eq!(length.parse::<usize>().expect("numeric length"), headers.len());
        assert!(headers.contains("CONTENT_LENGTH\042\0"));
        assert!(headers.contains("SCGI\01\0"));
    }

    #[test]
    fn missing_socket_surfaces_as_transport_error() {
        let transport = ScgiTransport {
            socket: PathBuf::from("/definitely/missing/rtorrent.sock"),
        };
        assert!(transport.process_body(b"<xml/>").is_err());
    }
}
