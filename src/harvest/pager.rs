//! Record pagination
//!
//! Walks a `ListRecords` result one page at a time, following resumption
//! tokens until the server stops sending them. Only the current page is
//! held in memory.

use crate::harvest::Record;
use crate::protocol::{parse_response, OaiRequest, ParsedResponse, QueryClient};
use crate::{ConfigError, ProtocolError, SeedError};
use std::collections::{HashSet, VecDeque};

/// OAI error codes that mean the request parameters are wrong
const ARGUMENT_ERRORS: &[&str] = &["badArgument", "cannotDisseminateFormat", "noSetHierarchy"];

/// OAI error code for an empty result
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// Counters kept while paging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerStats {
    pub pages_fetched: u64,
    pub deleted_skipped: u64,
}

/// Forward-only sequence of the records of one `ListRecords` result
#[derive(Debug)]
pub struct RecordPager<'a> {
    client: &'a QueryClient,
    next_request: Option<OaiRequest>,
    page: VecDeque<Record>,
    seen_tokens: HashSet<String>,
    stats: PagerStats,
}

impl<'a> RecordPager<'a> {
    pub fn new(client: &'a QueryClient, first: OaiRequest) -> Self {
        Self {
            client,
            next_request: Some(first),
            page: VecDeque::new(),
            seen_tokens: HashSet::new(),
            stats: PagerStats::default(),
        }
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    /// Next live record, fetching the next page when the current one is used up
    ///
    /// Returns `Ok(None)` once the last page has been consumed.
    pub async fn next_record(&mut self) -> Result<Option<Record>, SeedError> {
        loop {
            if let Some(record) = self.page.pop_front() {
                if record.deleted {
                    self.stats.deleted_skipped += 1;
                    tracing::trace!("Skipping deleted record {}", record.identifier);
                    continue;
                }
                return Ok(Some(record));
            }

            let Some(request) = self.next_request.take() else {
                return Ok(None);
            };
            self.fetch_page(request).await?;
        }
    }

    /// Consumes the sequence, threading `init` through `f`
    pub async fn fold<T, F>(mut self, init: T, mut f: F) -> Result<(T, PagerStats), SeedError>
    where
        F: FnMut(T, Record) -> T,
    {
        let mut acc = init;
        while let Some(record) = self.next_record().await? {
            acc = f(acc, record);
        }
        Ok((acc, self.stats))
    }

    async fn fetch_page(&mut self, request: OaiRequest) -> Result<(), SeedError> {
        let url = self.client.request_url(&request).to_string();
        let body = self.client.execute(&request).await?;
        self.stats.pages_fetched += 1;

        match parse_response(&body, &url)? {
            ParsedResponse::Records(page) => {
                tracing::debug!(
                    "Page {} from {}: {} records (complete list size: {:?})",
                    self.stats.pages_fetched,
                    url,
                    page.records.len(),
                    page.complete_list_size
                );
                self.page.extend(page.records);

                if let Some(token) = page.resumption_token.filter(|t| !t.trim().is_empty()) {
                    if !self.seen_tokens.insert(token.clone()) {
                        return Err(ProtocolError::RepeatedToken { url, token }.into());
                    }
                    self.next_request = Some(OaiRequest::Resume { token });
                }
                Ok(())
            }
            ParsedResponse::Error { code, .. } if code == NO_RECORDS_MATCH => {
                tracing::info!("No records match {}", url);
                Ok(())
            }
            ParsedResponse::Error { code, message } => Err(oai_error(url, code, message)),
            ParsedResponse::Identity(_) => Err(ProtocolError::Malformed {
                url,
                message: "Identify answer to ListRecords".to_string(),
            }
            .into()),
        }
    }
}

/// Argument errors are the session's fault; anything else is the server's
fn oai_error(url: String, code: String, message: String) -> SeedError {
    if ARGUMENT_ERRORS.contains(&code.as_str()) {
        tracing::error!("{} rejected the harvest parameters: {} ({})", url, message, code);
        ConfigError::RejectedArgument { code, message }.into()
    } else {
        ProtocolError::Oai { url, code, message }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ConfiguredRetryBudget, FetchError, FetchFlags, FetchedResource, Fetcher,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    /// Answers by matching the resumption token in the URL
    struct Pages(Vec<(&'static str, String)>);

    #[async_trait]
    impl Fetcher for Pages {
        async fn fetch(&self, url: &str, _flags: FetchFlags) -> Result<FetchedResource, FetchError> {
            let body = self
                .0
                .iter()
                .rev()
                .find(|(needle, _)| url.contains(needle))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| FetchError::fatal(url, "unexpected request"))?;
            Ok(FetchedResource::ok(url, body))
        }
    }

    fn record(id: &str, deleted: bool) -> String {
        if deleted {
            format!(
                r#"<record><header status="deleted"><identifier>{}</identifier></header></record>"#,
                id
            )
        } else {
            format!(
                r#"<record><header><identifier>{}</identifier></header><metadata><oai_dc:dc><dc:title>{}</dc:title></oai_dc:dc></metadata></record>"#,
                id, id
            )
        }
    }

    fn page(records: &[String], token: Option<&str>) -> String {
        let token = token
            .map(|t| format!("<resumptionToken>{}</resumptionToken>", t))
            .unwrap_or_default();
        format!(
            "<OAI-PMH><ListRecords>{}{}</ListRecords></OAI-PMH>",
            records.concat(),
            token
        )
    }

    fn client(pages: Vec<(&'static str, String)>) -> QueryClient {
        QueryClient::new(
            Url::parse("https://repository.example.edu/oai/request").unwrap(),
            Arc::new(Pages(pages)),
            Arc::new(ConfiguredRetryBudget::new(0, 0, Duration::ZERO)),
        )
    }

    fn first() -> OaiRequest {
        OaiRequest::ListRecords {
            metadata_prefix: "oai_dc".to_string(),
            set_spec: None,
            range: Default::default(),
        }
    }

    async fn identifiers(client: &QueryClient) -> Result<(Vec<String>, PagerStats), SeedError> {
        RecordPager::new(client, first())
            .fold(Vec::new(), |mut ids, record| {
                ids.push(record.identifier);
                ids
            })
            .await
    }

    #[tokio::test]
    async fn test_follows_resumption_tokens() {
        let client = client(vec![
            ("verb=ListRecords", page(&[record("a", false), record("b", false)], Some("p2"))),
            ("resumptionToken=p2", page(&[record("c", false)], Some(""))),
        ]);

        let (ids, stats) = identifiers(&client).await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(stats.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_skips_deleted_records() {
        let client = client(vec![(
            "verb=ListRecords",
            page(&[record("a", true), record("b", false)], None),
        )]);

        let (ids, stats) = identifiers(&client).await.unwrap();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(stats.deleted_skipped, 1);
    }

    #[tokio::test]
    async fn test_no_records_match_is_empty() {
        let client = client(vec![(
            "verb=ListRecords",
            r#"<OAI-PMH><error code="noRecordsMatch">Nothing</error></OAI-PMH>"#.to_string(),
        )]);

        let (ids, _) = identifiers(&client).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_bad_argument_is_config_error() {
        let client = client(vec![(
            "verb=ListRecords",
            r#"<OAI-PMH><error code="badArgument">Bad from</error></OAI-PMH>"#.to_string(),
        )]);

        let err = identifiers(&client).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_other_oai_error_is_protocol_error() {
        let client = client(vec![(
            "verb=ListRecords",
            r#"<OAI-PMH><error code="badResumptionToken">Expired</error></OAI-PMH>"#.to_string(),
        )]);

        let err = identifiers(&client).await.unwrap_err();
        assert!(matches!(err, SeedError::Protocol(ProtocolError::Oai { .. })));
    }

    #[tokio::test]
    async fn test_repeated_token_is_protocol_error() {
        let client = client(vec![
            ("verb=ListRecords", page(&[record("a", false)], Some("loop"))),
            ("resumptionToken=loop", page(&[record("b", false)], Some("loop"))),
        ]);

        let err = identifiers(&client).await.unwrap_err();
        assert!(matches!(
            err,
            SeedError::Protocol(ProtocolError::RepeatedToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_each_pass_starts_from_first_page() {
        let client = client(vec![
            ("verb=ListRecords", page(&[record("a", false)], Some("p2"))),
            ("resumptionToken=p2", page(&[record("b", false)], None)),
        ]);

        let (first_pass, _) = identifiers(&client).await.unwrap();
        let (second_pass, _) = identifiers(&client).await.unwrap();
        assert_eq!(first_pass, second_pass);
    }
}
