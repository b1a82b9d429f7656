use crate::config::SessionConfig;
use crate::harvest::{FilterRule, HarvesterProfile, RecordPager};
use crate::protocol::{DateRange, OaiRequest, QueryClient};
use crate::url::parse_base_url;
use crate::ConfigError;
use url::Url;

/// Default OAI-PMH endpoint path under the base URL
const DEFAULT_ENDPOINT_PATH: &str = "oai/request";

/// One configured harvest
///
/// Built once from configuration and never modified; every call to
/// [`HarvestSession::records`] starts a fresh pass from the first page.
#[derive(Debug, Clone)]
pub struct HarvestSession {
    /// Always ends with `/`
    pub base_url: Url,
    pub endpoint: Url,
    pub metadata_prefix: String,
    pub set_spec: Option<String>,
    pub date_range: DateRange,
    pub filter_rule: Option<FilterRule>,
    pub permission_urls: Vec<String>,
    pub fail_on_empty: bool,
}

impl HarvestSession {
    /// Builds a session from the `[session]` table
    ///
    /// # Arguments
    ///
    /// * `config` - The session configuration
    /// * `profile` - Supplies the date tag and match mode of the year rule
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestSession)` - Ready to harvest
    /// * `Err(ConfigError)` - Bad URL, year or date; nothing has been requested yet
    pub fn from_config(
        config: &SessionConfig,
        profile: &HarvesterProfile,
    ) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let endpoint = match &config.oai_request_url {
            Some(endpoint) => Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", endpoint, e)))?,
            None => base_url
                .join(DEFAULT_ENDPOINT_PATH)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?,
        };

        let filter_rule = config
            .year
            .as_deref()
            .map(|year| FilterRule::new(profile.date_path.clone(), year, profile.year_match))
            .transpose()?;

        let date_range = DateRange::parse(config.from.as_deref(), config.until.as_deref())?;
        if filter_rule.is_some() && !date_range.is_unbounded() {
            return Err(ConfigError::Validation(
                "session.year cannot be combined with session.from/until".to_string(),
            ));
        }

        let permission_urls = if config.permission_urls.is_empty() {
            vec![base_url.to_string()]
        } else {
            config.permission_urls.clone()
        };

        Ok(Self {
            base_url,
            endpoint,
            metadata_prefix: config.metadata_prefix.clone(),
            set_spec: config.set_spec.clone(),
            date_range,
            filter_rule,
            permission_urls,
            fail_on_empty: config.fail_on_empty,
        })
    }

    /// The first-page `ListRecords` request
    pub fn list_records_request(&self) -> OaiRequest {
        OaiRequest::ListRecords {
            metadata_prefix: self.metadata_prefix.clone(),
            set_spec: self.set_spec.clone(),
            range: self.date_range,
        }
    }

    /// URL of the first-page request; the manifest is stored under it
    pub fn origin_url(&self) -> String {
        self.list_records_request().to_url(&self.endpoint).to_string()
    }

    /// A new pass over the session's records
    pub fn records<'a>(&self, client: &'a QueryClient) -> RecordPager<'a> {
        RecordPager::new(client, self.list_records_request())
    }
}
