use serde_json::Value;
use tracing::{debug, info};

use crate::config::XenoCantoCriteria;
use crate::domain::{CatalogSource, QualityRank, Recording};
use crate::error::BirdcallError;
use crate::http::{CATALOG_TIMEOUT, HttpClient, get_success};
use crate::progress::ProgressTracker;

pub const XENO_CANTO_API: &str = "https://xeno-canto.org/api/2/recordings";

/// Share of the run spent listing pages.
pub const LISTING_SPAN: f64 = 0.1;

const SERVICE: &str = "xeno-canto";

/// Everything one paginated query produced. `failure` is set when paging
/// stopped early; `recordings` still holds the pages read before that.
#[derive(Debug, Default)]
pub struct CatalogHarvest {
    pub recordings: Vec<Recording>,
    pub pages: u32,
    pub failure: Option<BirdcallError>,
}

pub struct CatalogPaginator<'a, H: HttpClient + ?Sized> {
    http: &'a H,
    base_url: String,
}

impl<'a, H: HttpClient + ?Sized> CatalogPaginator<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self {
            http,
            base_url: XENO_CANTO_API.to_string(),
        }
    }

    pub fn page_url(&self, query: &str, page: Option<u32>) -> String {
        match page {
            Some(page) => format!("{}?query={query}&page={page}", self.base_url),
            None => format!("{}?query={query}", self.base_url),
        }
    }

    /// Reads every result page for `criteria`, reporting listing progress on
    /// `[0.0, LISTING_SPAN]`.
    pub fn query(
        &self,
        criteria: &XenoCantoCriteria,
        progress: &mut ProgressTracker<'_>,
    ) -> CatalogHarvest {
        let query = match build_query(criteria) {
            Ok(query) => query,
            Err(err) => {
                return CatalogHarvest {
                    failure: Some(err),
                    ..CatalogHarvest::default()
                };
            }
        };

        info!("fetching Xeno-Canto data with query {query}");
        let num_pages = match self.fetch_page(&self.page_url(&query, None)) {
            Ok(page) => page.num_pages,
            Err(err) => {
                return CatalogHarvest {
                    failure: Some(err),
                    ..CatalogHarvest::default()
                };
            }
        };
        info!("found {num_pages} pages of Xeno-Canto data");

        let mut harvest = CatalogHarvest {
            pages: num_pages,
            ..CatalogHarvest::default()
        };
        for page in 1..=num_pages {
            progress.report_phase(0.0, LISTING_SPAN, (page - 1) as usize, num_pages as usize);
            info!("loading Xeno-Canto recordings page {page}/{num_pages}");
            match self.fetch_page(&self.page_url(&query, Some(page))) {
                Ok(parsed) => harvest.recordings.extend(parsed.recordings),
                Err(err) => {
                    harvest.failure = Some(err);
                    break;
                }
            }
        }
        harvest
    }

    fn fetch_page(&self, url: &str) -> Result<ParsedPage, BirdcallError> {
        let response = get_success(self.http, SERVICE, url, Some(CATALOG_TIMEOUT))?;
        let json: Value = serde_json::from_slice(&response.body)
            .map_err(|err| BirdcallError::parse_anomaly(SERVICE, err))?;
        Ok(parse_page(&json))
    }
}

/// Conjunctive Xeno-Canto search, e.g. `grp:"birds"+cnt:Brazil+q:">C"+len_lt:300`.
pub fn build_query(criteria: &XenoCantoCriteria) -> Result<String, BirdcallError> {
    if criteria.location.is_none() && criteria.country.is_none() {
        return Err(BirdcallError::MissingSearchScope(
            "either country or location must be specified for Xeno-Canto downloads".to_string(),
        ));
    }

    let mut terms = vec![format!("grp:\"{}\"", criteria.group)];
    if let Some(location) = &criteria.location {
        terms.push(format!("loc:{location}"));
    }
    if let Some(country) = &criteria.country {
        terms.push(format!("cnt:{country}"));
    }
    if let Some(rank) = criteria.better_than {
        terms.push(format!("q:\">{rank}\""));
    }
    if let Some(min) = criteria.min_length_seconds {
        terms.push(format!("len_gt:{min}"));
    }
    if let Some(max) = criteria.max_length_seconds {
        terms.push(format!("len_lt:{max}"));
    }
    Ok(terms.join("+"))
}

#[derive(Debug)]
struct ParsedPage {
    num_pages: u32,
    recordings: Vec<Recording>,
}

fn parse_page(json: &Value) -> ParsedPage {
    let num_pages = json
        .get("numPages")
        .and_then(value_as_u64)
        .and_then(|pages| u32::try_from(pages).ok())
        .unwrap_or(0);
    let recordings = json
        .get("recordings")
        .and_then(|value| value.as_array())
        .map(|items| items.iter().filter_map(parse_recording).collect())
        .unwrap_or_default();
    ParsedPage {
        num_pages,
        recordings,
    }
}

fn parse_recording(value: &Value) -> Option<Recording> {
    let Some(id) = text_field(value, "id") else {
        debug!("dropping Xeno-Canto record without id");
        return None;
    };
    let quality_label = text_field(value, "q");
    if quality_label.is_none() {
        debug!("Xeno-Canto record {id} has no quality rating");
    }
    Some(Recording {
        source: CatalogSource::XenoCanto,
        quality: QualityRank::from_symbol(quality_label.as_deref()),
        quality_label,
        species: text_field(value, "en"),
        location: text_field(value, "loc"),
        recordist: text_field(value, "rec"),
        media_url: text_field(value, "file").map(absolute_url),
        id,
    })
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn absolute_url(url: String) -> String {
    if url.starts_with("//") {
        return format!("https:{url}");
    }
    url
}
