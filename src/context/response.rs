use http::header::CONTENT_TYPE;
use http::header::LOCATION;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use http::StatusCode;

use crate::Error;
use crate::Result;

/// Buffered HTTP response built up while a request is dispatched
///
/// Once committed the status and headers are final. The body can still be
/// appended to, which is how error reports reach a half rendered page.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(
        &mut self,
        status: StatusCode,
    ) {
        if !self.committed {
            self.status = status;
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replaces the named header. Ignored once committed.
    pub fn set_header(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        if self.committed {
            return Ok(());
        }
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(Error::handler)?;
        let value = HeaderValue::from_str(value).map_err(Error::handler)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn append_header(
        &mut self,
        name: HeaderName,
        value: HeaderValue,
    ) {
        if !self.committed {
            self.headers.append(name, value);
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn set_content_type(
        &mut self,
        content_type: &str,
    ) -> Result<()> {
        self.set_header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Issues a 302 to `location` and commits the response.
    pub fn send_redirect(
        &mut self,
        location: &str,
    ) -> Result<()> {
        self.body.clear();
        self.set_status(StatusCode::FOUND);
        self.set_header(LOCATION.as_str(), location)?;
        self.commit();
        Ok(())
    }

    pub fn write_str(
        &mut self,
        s: &str,
    ) {
        self.body.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(
        &mut self,
        bytes: &[u8],
    ) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, lossily decoded
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn commit(&mut self) {
        self.committed = true;
    }

    /// Drops buffered body content if the response is not committed yet.
    pub fn reset_buffer(&mut self) {
        if !self.committed {
            self.body.clear();
        }
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}
