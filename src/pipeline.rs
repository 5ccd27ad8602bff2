use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::SearchCriteria;
use crate::domain::{CatalogSource, DownloadTask, Recording};
use crate::fetcher::FileFetcher;
use crate::http::HttpClient;
use crate::macaulay::{
    CardSource, CatalogScraper, EbirdApiClient, MacaulayHtmlSource, RegionFallbackCursor,
    TaxonomySource,
};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::selector::select;
use crate::store::DownloadLayout;
use crate::xeno_canto::{CatalogPaginator, LISTING_SPAN};

/// Pause after each file written from Xeno-Canto.
pub const XENO_CANTO_DOWNLOAD_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub xeno_canto: usize,
    pub macaulay: usize,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.xeno_canto + self.macaulay
    }
}

/// Which pipelines a joint run should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub xeno_canto: bool,
    pub macaulay: bool,
}

impl RunPlan {
    pub fn both() -> Self {
        Self {
            xeno_canto: true,
            macaulay: true,
        }
    }
}

/// Entry points for the two download pipelines.
///
/// Each `run_*` call owns its progress state and returns the number of files
/// written; nothing is shared between the two except the HTTP transport.
pub struct DownloadOrchestrator<'a, H: HttpClient + ?Sized> {
    http: &'a H,
    download_delay: Duration,
}

impl<'a, H: HttpClient + ?Sized> DownloadOrchestrator<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self {
            http,
            download_delay: XENO_CANTO_DOWNLOAD_DELAY,
        }
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    pub fn run_xeno_canto(&self, criteria: &SearchCriteria, sink: &dyn ProgressSink) -> usize {
        let mut progress = ProgressTracker::start(sink);
        let xeno = &criteria.xeno;
        if !xeno.is_runnable() {
            error!("either country or location must be specified for Xeno-Canto downloads");
            return 0;
        }

        let harvest = CatalogPaginator::new(self.http).query(xeno, &mut progress);
        if let Some(err) = &harvest.failure {
            error!(
                "Xeno-Canto listing failed after {} recordings: {err}",
                harvest.recordings.len()
            );
        } else if harvest.pages == 0 {
            warn!("no recordings found on Xeno-Canto");
            return 0;
        }

        info!("processing recordings by species");
        let layout = DownloadLayout::new(criteria.download_root.clone());
        if let Err(err) = layout.ensure_source_dir(CatalogSource::XenoCanto) {
            error!("cannot prepare {}: {err}", layout.root());
            return 0;
        }
        let tasks: Vec<DownloadTask> = select(harvest.recordings, xeno.max_per_species)
            .into_iter()
            .flat_map(|group| {
                let directory = layout.species_dir(CatalogSource::XenoCanto, &group.species);
                group
                    .recordings
                    .into_iter()
                    .filter(Recording::is_downloadable)
                    .filter_map(move |recording| {
                        Some(DownloadTask {
                            directory: directory.clone(),
                            filename: recording.raw_filename(),
                            url: recording.media_url?,
                        })
                    })
            })
            .collect();

        info!("downloading {} Xeno-Canto recordings", tasks.len());
        progress.report(LISTING_SPAN);
        let fetcher = FileFetcher::new(self.http);
        let mut written = 0;
        for (index, task) in tasks.iter().enumerate() {
            progress.report_phase(LISTING_SPAN, 1.0 - LISTING_SPAN, index, tasks.len());
            if fetcher.fetch_task(task, criteria.overwrite).written {
                written += 1;
                if !self.download_delay.is_zero() {
                    thread::sleep(self.download_delay);
                }
            }
        }

        info!("completed Xeno-Canto downloads: {written} files");
        written
    }

    pub fn run_macaulay(&self, criteria: &SearchCriteria, sink: &dyn ProgressSink) -> usize {
        let taxonomy = EbirdApiClient::new(self.http);
        let cards = MacaulayHtmlSource::new(self.http);
        self.run_macaulay_with(&taxonomy, &cards, criteria, sink)
    }

    /// Source B against explicit taxonomy and card capabilities.
    pub fn run_macaulay_with<T, C>(
        &self,
        taxonomy: &T,
        cards: &C,
        criteria: &SearchCriteria,
        sink: &dyn ProgressSink,
    ) -> usize
    where
        T: TaxonomySource + ?Sized,
        C: CardSource + ?Sized,
    {
        let mut progress = ProgressTracker::start(sink);
        let macaulay = &criteria.macaulay;
        let Some(api_key) = macaulay.api_key.as_deref() else {
            error!("eBird API key is required for Macaulay Library downloads");
            return 0;
        };
        let Some(region_code) = macaulay.region_code.as_ref() else {
            error!("eBird region code is required for Macaulay Library downloads");
            return 0;
        };

        info!("fetching species list for region {region_code}");
        let taxon_codes = match taxonomy.species_codes(region_code, api_key) {
            Ok(codes) => codes,
            Err(err) => {
                error!("failed to get species list: {err}");
                return 0;
            }
        };
        let common_names = match taxonomy.common_names(api_key) {
            Ok(names) => names,
            Err(err) => {
                error!("failed to get eBird taxonomy: {err}");
                return 0;
            }
        };
        progress.report(LISTING_SPAN);

        let layout = DownloadLayout::new(criteria.download_root.clone());
        if let Err(err) = layout.ensure_source_dir(CatalogSource::Macaulay) {
            error!("cannot prepare {}: {err}", layout.root());
            return 0;
        }
        let scraper = CatalogScraper::new(
            cards,
            self.http,
            macaulay.max_per_species,
            criteria.overwrite,
        );
        let total = taxon_codes.len();
        let mut written = 0;
        for (index, taxon_code) in taxon_codes.iter().enumerate() {
            progress.report_phase(LISTING_SPAN, 1.0 - LISTING_SPAN, index, total);
            let Some(species) = common_names.get(taxon_code) else {
                warn!("skipping taxon {taxon_code}: not in eBird taxonomy");
                continue;
            };
            info!("processing {}/{total}: {species}", index + 1);

            let harvest = scraper.collect_species(
                taxon_code,
                species,
                RegionFallbackCursor::new(region_code, &macaulay.backup_region_codes),
                &layout.species_dir(CatalogSource::Macaulay, species),
            );
            written += harvest.written;
            if let Some(err) = harvest.failure {
                error!("Macaulay Library search failed for {species}: {err}");
                break;
            }
        }

        info!("completed eBird/ML downloads: {written} files");
        written
    }

    /// Runs the planned pipelines side by side and joins them. A pipeline left
    /// out of the plan reports completion on its sink and counts zero.
    pub fn run_all(
        &self,
        criteria: &SearchCriteria,
        plan: RunPlan,
        xeno_sink: &dyn ProgressSink,
        macaulay_sink: &dyn ProgressSink,
    ) -> DownloadSummary {
        thread::scope(|scope| {
            let xeno = plan
                .xeno_canto
                .then(|| scope.spawn(move || self.run_xeno_canto(criteria, xeno_sink)));
            let macaulay = plan
                .macaulay
                .then(|| scope.spawn(move || self.run_macaulay(criteria, macaulay_sink)));

            if xeno.is_none() {
                xeno_sink.notify(1.0);
            }
            if macaulay.is_none() {
                macaulay_sink.notify(1.0);
            }

            DownloadSummary {
                xeno_canto: join_count(xeno, CatalogSource::XenoCanto),
                macaulay: join_count(macaulay, CatalogSource::Macaulay),
            }
        })
    }
}

fn join_count(handle: Option<thread::ScopedJoinHandle<'_, usize>>, source: CatalogSource) -> usize {
    match handle.map(|handle| handle.join()) {
        Some(Ok(count)) => count,
        Some(Err(_)) => {
            error!("{} pipeline panicked", source.label());
            0
        }
        None => 0,
    }
}
