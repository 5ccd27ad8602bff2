use std::collections::{HashMap, VecDeque};
use std::fmt;

use camino::Utf8Path;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::dedupe::AssetDeduper;
use crate::domain::{CatalogSource, DownloadTask, RegionCode};
use crate::error::BirdcallError;
use crate::fetcher::FileFetcher;
use crate::http::{CATALOG_TIMEOUT, HttpClient, get_success};

pub const EBIRD_API: &str = "https://api.ebird.org/v2";
pub const MACAULAY_CATALOG: &str = "https://media.ebird.org/catalog";
pub const MACAULAY_MEDIA: &str = "https://cdn.download.ams.birds.cornell.edu/api/v2/asset";

/// One parsed search result from the Macaulay Library grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub asset_id: String,
    pub contributor: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionFilter {
    Region(RegionCode),
    /// Terminal fallback: no region restriction at all.
    Anywhere,
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::Region(code) => write!(f, "{code}"),
            RegionFilter::Anywhere => write!(f, "anywhere"),
        }
    }
}

/// Primary region, then each backup in order, then [`RegionFilter::Anywhere`].
#[derive(Debug, Clone)]
pub struct RegionFallbackCursor {
    pending: VecDeque<RegionFilter>,
}

impl RegionFallbackCursor {
    pub fn new(primary: &RegionCode, backups: &[RegionCode]) -> Self {
        let mut pending = VecDeque::with_capacity(backups.len() + 2);
        pending.push_back(RegionFilter::Region(primary.clone()));
        pending.extend(backups.iter().cloned().map(RegionFilter::Region));
        pending.push_back(RegionFilter::Anywhere);
        Self { pending }
    }
}

impl Iterator for RegionFallbackCursor {
    type Item = RegionFilter;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.pop_front()
    }
}

/// Result-card listing for one taxon in one region.
pub trait CardSource: Send + Sync {
    fn cards(
        &self,
        taxon_code: &str,
        region: &RegionFilter,
    ) -> Result<Vec<ResultCard>, BirdcallError>;
}

/// eBird species list and taxonomy lookups.
pub trait TaxonomySource: Send + Sync {
    fn species_codes(
        &self,
        region: &RegionCode,
        api_key: &str,
    ) -> Result<Vec<String>, BirdcallError>;
    fn common_names(&self, api_key: &str) -> Result<HashMap<String, String>, BirdcallError>;
}

pub struct EbirdApiClient<'a, H: HttpClient + ?Sized> {
    http: &'a H,
    base_url: String,
}

impl<'a, H: HttpClient + ?Sized> EbirdApiClient<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self {
            http,
            base_url: EBIRD_API.to_string(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BirdcallError> {
        let response = get_success(self.http, "ebird", url, Some(CATALOG_TIMEOUT))?;
        // A bad key or region answers with an HTML or plain-text body.
        serde_json::from_slice(&response.body).map_err(|err| {
            BirdcallError::upstream(
                "ebird",
                format!("unreadable response ({err}); check the API key and region code"),
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct TaxonEntry {
    #[serde(rename = "speciesCode")]
    species_code: String,
    #[serde(rename = "comName")]
    common_name: String,
}

impl<H: HttpClient + ?Sized> TaxonomySource for EbirdApiClient<'_, H> {
    fn species_codes(
        &self,
        region: &RegionCode,
        api_key: &str,
    ) -> Result<Vec<String>, BirdcallError> {
        let url = format!("{}/product/spplist/{region}?key={api_key}", self.base_url);
        self.get_json(&url)
    }

    fn common_names(&self, api_key: &str) -> Result<HashMap<String, String>, BirdcallError> {
        let url = format!("{}/ref/taxonomy/ebird?key={api_key}&fmt=json", self.base_url);
        let entries: Vec<TaxonEntry> = self.get_json(&url)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.species_code, entry.common_name))
            .collect())
    }
}

pub struct MacaulayHtmlSource<'a, H: HttpClient + ?Sized> {
    http: &'a H,
    catalog_url: String,
}

impl<'a, H: HttpClient + ?Sized> MacaulayHtmlSource<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self {
            http,
            catalog_url: MACAULAY_CATALOG.to_string(),
        }
    }

    /// Audio results for `taxon_code`, highest rated first.
    pub fn search_url(&self, taxon_code: &str, region: &RegionFilter) -> String {
        let mut url = format!(
            "{}?taxonCode={taxon_code}&mediaType=audio&sort=rating_rank_desc&view=grid",
            self.catalog_url
        );
        if let RegionFilter::Region(code) = region {
            url.push_str(&format!("&regionCode={code}"));
        }
        url
    }
}

impl<H: HttpClient + ?Sized> CardSource for MacaulayHtmlSource<'_, H> {
    fn cards(
        &self,
        taxon_code: &str,
        region: &RegionFilter,
    ) -> Result<Vec<ResultCard>, BirdcallError> {
        let url = self.search_url(taxon_code, region);
        let response = get_success(self.http, "macaulay", &url, Some(CATALOG_TIMEOUT))?;
        Ok(parse_cards(&response.text()))
    }
}

/// Extracts result cards from a catalog grid page. Cards without an asset id
/// are dropped.
pub fn parse_cards(html: &str) -> Vec<ResultCard> {
    let (Ok(card_sel), Ok(asset_sel), Ok(meta_sel), Ok(link_sel), Ok(span_sel)) = (
        Selector::parse("li.ResultsGrid-card"),
        Selector::parse("[data-asset-id]"),
        Selector::parse("div.userDateLoc"),
        Selector::parse("a"),
        Selector::parse("span"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut cards = Vec::new();
    for card in document.select(&card_sel) {
        let asset_id = card
            .value()
            .attr("data-asset-id")
            .or_else(|| {
                card.select(&asset_sel)
                    .next()
                    .and_then(|el| el.value().attr("data-asset-id"))
            })
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let Some(asset_id) = asset_id else {
            debug!("dropping result card without asset id");
            continue;
        };

        let meta = card.select(&meta_sel).next();
        let contributor = meta
            .and_then(|meta| meta.select(&link_sel).next())
            .and_then(element_text);
        let location = meta
            .and_then(|meta| meta.select(&span_sel).last())
            .and_then(element_text);

        cards.push(ResultCard {
            asset_id: asset_id.to_string(),
            contributor,
            location,
        });
    }
    cards
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

pub fn media_url(asset_id: &str) -> String {
    format!("{MACAULAY_MEDIA}/{asset_id}/mp3")
}

pub fn card_filename(species: &str, card: &ResultCard) -> String {
    format!(
        "{species}; {}; {}; {}{}.mp3",
        card.location.as_deref().unwrap_or(""),
        card.contributor.as_deref().unwrap_or(""),
        CatalogSource::Macaulay.id_prefix(),
        card.asset_id
    )
}

/// Outcome of collecting one species. `failure` is an upstream error that
/// stopped collection; the counts cover the work done before it.
#[derive(Debug, Default)]
pub struct SpeciesHarvest {
    pub attempted: usize,
    pub written: usize,
    pub failure: Option<BirdcallError>,
}

/// Walks the region fallback for one species at a time, downloading up to
/// `cap` distinct assets.
pub struct CatalogScraper<'a, C: CardSource + ?Sized, H: HttpClient + ?Sized> {
    cards: &'a C,
    fetcher: FileFetcher<'a, H>,
    cap: usize,
    overwrite: bool,
}

impl<'a, C: CardSource + ?Sized, H: HttpClient + ?Sized> CatalogScraper<'a, C, H> {
    pub fn new(cards: &'a C, http: &'a H, cap: usize, overwrite: bool) -> Self {
        Self {
            cards,
            fetcher: FileFetcher::new(http),
            cap,
            overwrite,
        }
    }

    pub fn collect_species(
        &self,
        taxon_code: &str,
        species: &str,
        regions: RegionFallbackCursor,
        species_dir: &Utf8Path,
    ) -> SpeciesHarvest {
        let mut harvest = SpeciesHarvest::default();
        let mut seen = AssetDeduper::new();

        for region in regions {
            if seen.len() >= self.cap {
                break;
            }
            let cards = match self.cards.cards(taxon_code, &region) {
                Ok(cards) => cards,
                Err(err) => {
                    harvest.failure = Some(err);
                    break;
                }
            };
            if cards.is_empty() {
                debug!("no {species} recordings in {region}, trying next region");
                continue;
            }

            for card in cards {
                if seen.len() >= self.cap {
                    break;
                }
                // Marked before downloading so a failed fetch is not retried
                // when the asset shows up again in a later region.
                if !seen.mark(&card.asset_id) {
                    continue;
                }
                let task = DownloadTask {
                    directory: species_dir.to_path_buf(),
                    filename: card_filename(species, &card),
                    url: media_url(&card.asset_id),
                };
                harvest.attempted += 1;
                if self.fetcher.fetch_task(&task, self.overwrite).written {
                    harvest.written += 1;
                }
            }
        }
        if seen.is_empty() && harvest.failure.is_none() {
            debug!("no {species} recordings in any region");
        }
        harvest
    }
}
