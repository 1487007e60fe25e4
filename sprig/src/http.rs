//! The narrow request/response boundary between a transport and the
//! [Dispatcher](crate::dispatcher::Dispatcher).

#[cfg(test)]
use mockall::automock;

/// Query parameters in the order their names were first seen. Repeated names accumulate values.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct QueryParameters {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParameters {
    /// Adds a value for given name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// All values for given name.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for QueryParameters {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut parameters = Self::default();
        for (name, value) in iter {
            parameters.append(name, value);
        }

        parameters
    }
}

/// Inbound request, as seen by the dispatcher and handlers.
pub trait Request {
    /// Full request path, including the context prefix.
    fn path(&self) -> &str;

    /// Application context prefix, possibly empty.
    fn context_path(&self) -> &str;

    fn parameters(&self) -> &QueryParameters;
}

/// Outbound response handle.
#[cfg_attr(test, automock)]
pub trait Response {
    /// Appends text to the response body.
    fn write(&mut self, text: &str);
}

/// A plain request value, useful for transports and tests.
#[derive(Clone, Default, Debug)]
pub struct SimpleRequest {
    pub path: String,
    pub context_path: String,
    pub parameters: QueryParameters,
}

impl SimpleRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.append(name, value);
        self
    }
}

impl Request for SimpleRequest {
    #[inline]
    fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    fn context_path(&self) -> &str {
        &self.context_path
    }

    #[inline]
    fn parameters(&self) -> &QueryParameters {
        &self.parameters
    }
}

/// A response collecting the body in memory.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct BufferedResponse {
    body: String,
}

impl BufferedResponse {
    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[inline]
    pub fn into_body(self) -> String {
        self.body
    }
}

impl Response for BufferedResponse {
    #[inline]
    fn write(&mut self, text: &str) {
        self.body.push_str(text);
    }
}
