//! OAI-PMH response parsing
//!
//! Responses are parsed into a small element tree first and then
//! interpreted, so that record metadata can be handed on as a tree.
//!
//! Tag paths name elements the way metadata formats are usually written
//! (`dc:date`). A prefix in a path stands for the namespace it is
//! conventionally bound to, so `dc:date` also finds `<date>` under a
//! default Dublin Core namespace or `<x:date>` with `x` bound to it.

use crate::harvest::Record;
use crate::ProtocolError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// Namespaces behind the prefixes used in tag paths
const KNOWN_NAMESPACES: &[(&str, &str)] = &[
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("oai_dc", "http://www.openarchives.org/OAI/2.0/oai_dc/"),
    ("mods", "http://www.loc.gov/mods/v3"),
];

/// The namespace URI conventionally bound to `prefix`
pub fn known_namespace(prefix: &str) -> Option<&'static str> {
    KNOWN_NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// One XML element with its text and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `dc:date`
    pub name: String,
    /// Namespace URI the name resolved to in the document
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// Concatenated direct text content
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder used by tests and callers assembling metadata by hand
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Namespace of this element: as resolved, else guessed from its prefix
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .or_else(|| self.prefix().and_then(known_namespace))
    }

    /// True if `segment` names this element
    ///
    /// An unprefixed segment matches on local name alone. A prefixed one
    /// also matches on local name, unless both the segment's prefix and
    /// this element have a known namespace and the two differ.
    pub fn is_named(&self, segment: &str) -> bool {
        if self.name == segment {
            return true;
        }
        match segment.split_once(':') {
            None => self.local_name() == segment,
            Some((prefix, local)) => {
                self.local_name() == local
                    && match (known_namespace(prefix), self.namespace_uri()) {
                        (Some(expected), Some(actual)) => expected == actual,
                        _ => true,
                    }
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is_named(name))
    }

    /// Trimmed text of the first child called `name`
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// All non-empty text values under a slash-separated tag path
    ///
    /// The path matches anywhere in the tree: `date` finds every `dc:date`,
    /// `dc/date` only those directly inside a `dc` element.
    pub fn values(&self, path: &str) -> Vec<&str> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut out = Vec::new();
        if segments.is_empty() {
            return out;
        }
        let mut trail = Vec::new();
        collect_values(self, &segments, &mut trail, &mut out);
        out
    }
}

fn collect_values<'a>(
    node: &'a Element,
    segments: &[&str],
    trail: &mut Vec<&'a Element>,
    out: &mut Vec<&'a str>,
) {
    trail.push(node);
    if trail.len() >= segments.len() {
        let tail = &trail[trail.len() - segments.len()..];
        if tail.iter().zip(segments).all(|(n, s)| n.is_named(s)) {
            let text = node.text.trim();
            if !text.is_empty() {
                out.push(text);
            }
        }
    }
    for child in &node.children {
        collect_values(child, segments, trail, out);
    }
    trail.pop();
}

/// One page of a `ListRecords` result
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Token for the next page; `None` or empty means this was the last page
    pub resumption_token: Option<String>,
    pub complete_list_size: Option<u64>,
}

/// Repository description returned by `Identify`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIdentity {
    pub repository_name: String,
    pub base_url: String,
    pub protocol_version: String,
    pub earliest_datestamp: String,
    pub granularity: String,
}

/// A parsed OAI-PMH response
#[derive(Debug, Clone)]
pub enum ParsedResponse {
    Records(RecordPage),
    Identity(RepositoryIdentity),
    /// The server answered with an OAI-PMH `<error>`
    Error { code: String, message: String },
}

/// Parses a response body fetched from `url`
pub fn parse_response(body: &[u8], url: &str) -> Result<ParsedResponse, ProtocolError> {
    let root = parse_tree(body, url)?;

    if !root.is_named("OAI-PMH") {
        return Err(malformed(
            url,
            format!("expected OAI-PMH root element, found <{}>", root.name),
        ));
    }

    let mut root = root;
    if let Some(error) = root.child("error") {
        return Ok(ParsedResponse::Error {
            code: error.attribute("code").unwrap_or("unknown").to_string(),
            message: error.text.trim().to_string(),
        });
    }

    if let Some(pos) = root.children.iter().position(|c| c.is_named("ListRecords")) {
        let list = root.children.swap_remove(pos);
        return parse_list_records(list, url).map(ParsedResponse::Records);
    }

    if let Some(identify) = root.child("Identify") {
        let text = |name: &str| identify.child_text(name).unwrap_or_default().to_string();
        return Ok(ParsedResponse::Identity(RepositoryIdentity {
            repository_name: text("repositoryName"),
            base_url: text("baseURL"),
            protocol_version: text("protocolVersion"),
            earliest_datestamp: text("earliestDatestamp"),
            granularity: text("granularity"),
        }));
    }

    Err(malformed(url, "response has no ListRecords, Identify or error"))
}

fn parse_list_records(list: Element, url: &str) -> Result<RecordPage, ProtocolError> {
    let mut page = RecordPage::default();

    for child in list.children {
        if child.is_named("record") {
            page.records.push(parse_record(child, url)?);
        } else if child.is_named("resumptionToken") {
            let token = child.text.trim();
            page.resumption_token = (!token.is_empty()).then(|| token.to_string());
            page.complete_list_size = child
                .attribute("completeListSize")
                .and_then(|v| v.parse().ok());
        }
    }

    Ok(page)
}

fn parse_record(record: Element, url: &str) -> Result<Record, ProtocolError> {
    let mut header = None;
    let mut metadata = None;
    for child in record.children {
        if child.is_named("header") {
            header = Some(child);
        } else if child.is_named("metadata") {
            // The metadata wrapper holds exactly one format-specific root
            metadata = child.children.into_iter().next();
        }
    }

    let header = header.ok_or_else(|| malformed(url, "record without header"))?;
    let identifier = header
        .child_text("identifier")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed(url, "record header without identifier"))?
        .to_string();

    Ok(Record {
        identifier,
        datestamp: header.child_text("datestamp").unwrap_or_default().to_string(),
        deleted: header.attribute("status") == Some("deleted"),
        metadata,
    })
}

/// Builds the element tree of a whole document
fn parse_tree(body: &[u8], url: &str) -> Result<Element, ProtocolError> {
    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| malformed(url, format!("XML error: {}", e)))?;
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
            _ => None,
        };
        match event {
            Event::Start(start) => stack.push(element_from(&start, namespace, url)?),
            Event::Empty(start) => {
                let element = element_from(&start, namespace, url)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed(url, format!("bad text: {}", e)))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(url, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed(url, "document ended inside an element"));
    }
    root.ok_or_else(|| malformed(url, "empty document"))
}

fn element_from(
    start: &BytesStart<'_>,
    namespace: Option<String>,
    url: &str,
) -> Result<Element, ProtocolError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    element.namespace = namespace;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(url, format!("bad attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(url, format!("bad attribute value: {}", e)))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn malformed(url: &str, message: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed {
        url: url.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://repository.example.edu/oai/request";

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  <request verb="ListRecords">https://repository.example.edu/oai/request</request>
  <ListRecords>
    <record>
      <header>
        <identifier>oai:repository.example.edu:123456789/1</identifier>
        <datestamp>2012-02-02T00:00:00Z</datestamp>
      </header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Soil &amp; Water</dc:title>
          <dc:date>2011-05-05</dc:date>
          <dc:date>2012-01-01T00:00:00Z</dc:date>
          <dc:identifier>http://hdl.handle.net/123456789/1</dc:identifier>
        </oai_dc:dc>
      </metadata>
    </record>
    <record>
      <header status="deleted">
        <identifier>oai:repository.example.edu:123456789/2</identifier>
        <datestamp>2012-02-02T00:00:00Z</datestamp>
      </header>
    </record>
    <resumptionToken completeListSize="250" cursor="0">page-2</resumptionToken>
  </ListRecords>
</OAI-PMH>"#;

    #[test]
    fn test_parse_list_records() {
        let ParsedResponse::Records(page) = parse_response(PAGE.as_bytes(), URL).unwrap() else {
            panic!("expected records");
        };

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.resumption_token.as_deref(), Some("page-2"));
        assert_eq!(page.complete_list_size, Some(250));

        let first = &page.records[0];
        assert_eq!(first.identifier, "oai:repository.example.edu:123456789/1");
        assert!(!first.deleted);
        assert_eq!(first.values("dc:date"), vec!["2011-05-05", "2012-01-01T00:00:00Z"]);
        assert_eq!(first.values("title"), vec!["Soil & Water"]);
        assert_eq!(first.values("dc/identifier"), vec!["http://hdl.handle.net/123456789/1"]);

        assert!(page.records[1].deleted);
        assert!(page.records[1].metadata.is_none());
    }

    #[test]
    fn test_empty_resumption_token_ends_list() {
        let body = r#"<OAI-PMH><ListRecords>
            <record><header><identifier>oai:x:1</identifier></header></record>
            <resumptionToken completeListSize="1"/>
        </ListRecords></OAI-PMH>"#;
        let ParsedResponse::Records(page) = parse_response(body.as_bytes(), URL).unwrap() else {
            panic!("expected records");
        };
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.resumption_token, None);
    }

    #[test]
    fn test_parse_oai_error() {
        let body = r#"<OAI-PMH><error code="noRecordsMatch">No matching records</error></OAI-PMH>"#;
        match parse_response(body.as_bytes(), URL).unwrap() {
            ParsedResponse::Error { code, message } => {
                assert_eq!(code, "noRecordsMatch");
                assert_eq!(message, "No matching records");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_identify() {
        let body = r#"<OAI-PMH><Identify>
            <repositoryName>Example Repository</repositoryName>
            <baseURL>https://repository.example.edu/oai/request</baseURL>
            <protocolVersion>2.0</protocolVersion>
            <earliestDatestamp>2001-01-01T00:00:00Z</earliestDatestamp>
            <granularity>YYYY-MM-DDThh:mm:ssZ</granularity>
        </Identify></OAI-PMH>"#;
        let ParsedResponse::Identity(identity) = parse_response(body.as_bytes(), URL).unwrap()
        else {
            panic!("expected identity");
        };
        assert_eq!(identity.repository_name, "Example Repository");
        assert_eq!(identity.protocol_version, "2.0");
    }

    #[test]
    fn test_rejects_non_oai_documents() {
        let body = "<html><body>Proxy login required</body></html>";
        assert!(matches!(
            parse_response(body.as_bytes(), URL),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            parse_response(b"", URL),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            parse_response(b"<OAI-PMH><ListRecords>", URL),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_record_without_identifier_is_malformed() {
        let body = r#"<OAI-PMH><ListRecords><record><header/></record></ListRecords></OAI-PMH>"#;
        assert!(parse_response(body.as_bytes(), URL).is_err());
    }

    #[test]
    fn test_values_follow_namespaces_not_prefixes() {
        let body = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords>
          <record>
            <header><identifier>oai:r.edu:1</identifier></header>
            <metadata>
              <dc xmlns="http://www.openarchives.org/OAI/2.0/oai_dc/">
                <date xmlns="http://purl.org/dc/elements/1.1/">2011-05-05</date>
                <identifier xmlns="http://purl.org/dc/elements/1.1/">https://r.edu/items/1</identifier>
              </dc>
            </metadata>
          </record>
          <record>
            <header><identifier>oai:r.edu:2</identifier></header>
            <metadata>
              <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                         xmlns:elem="http://purl.org/dc/elements/1.1/"
                         xmlns:dc="http://example.org/not-dublin-core/">
                <elem:date>2012</elem:date>
                <dc:date>1999</dc:date>
              </oai_dc:dc>
            </metadata>
          </record>
        </ListRecords></OAI-PMH>"#;
        let ParsedResponse::Records(page) = parse_response(body.as_bytes(), URL).unwrap() else {
            panic!("expected records");
        };

        let default_ns = &page.records[0];
        assert_eq!(default_ns.values("dc:date"), vec!["2011-05-05"]);
        assert_eq!(default_ns.values("dc:identifier"), vec!["https://r.edu/items/1"]);

        let other_prefix = &page.records[1];
        assert_eq!(other_prefix.values("dc:date"), vec!["2012"]);
        assert_eq!(other_prefix.values("date"), vec!["2012", "1999"]);
    }

    #[test]
    fn test_values_path_matching() {
        let tree = Element::new("oai_dc:dc")
            .with_child(Element::new("dc:date").with_text(" 2011 "))
            .with_child(
                Element::new("mods:originInfo")
                    .with_child(Element::new("mods:date").with_text("1999")),
            );

        assert_eq!(tree.values("date"), vec!["2011", "1999"]);
        assert_eq!(tree.values("dc:date"), vec!["2011"]);
        assert_eq!(tree.values("originInfo/date"), vec!["1999"]);
        assert!(tree.values("").is_empty());
        assert!(tree.values("missing").is_empty());
    }
}
