//! Application icon resolution.
//!
//! An [`IconResolver`] walks an ordered chain of platform [`IconStrategy`]s
//! and returns the first icon one of them produces. When every strategy
//! comes back empty it falls back to a synthesized placeholder, so
//! resolution always yields a PNG.

mod glyphs;
pub mod placeholder;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use image::DynamicImage;
use image::imageops::FilterType;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace};

pub use placeholder::{IconSynthesizer, PLACEHOLDER_SIZE};

/// Why one icon strategy produced nothing.
#[derive(Error, Debug)]
pub enum StrategyFailure {
    #[error("no icon found: {0}")]
    NotFound(String),

    #[error("helper failed: {0}")]
    Helper(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed to decode icon: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("platform call failed: {0}")]
    Native(String),
}

/// One way of obtaining a native icon for an application identifier.
#[async_trait]
pub trait IconStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Try to produce an icon for `app`.
    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure>;
}

/// PNG-encoded icon bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedIcon(Vec<u8>);

impl EncodedIcon {
    /// Encode `image` as PNG.
    pub fn encode(image: &DynamicImage) -> Result<Self, image::ImageError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
        Ok(Self(png))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `data:image/png;base64,...` URI for the host.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&self.0)
        )
    }
}

/// Resolves icons through a strategy chain with a placeholder fallback.
pub struct IconResolver {
    strategies: Vec<Box<dyn IconStrategy>>,
    synthesizer: IconSynthesizer,
    max_icon_size: u32,
}

impl IconResolver {
    pub fn new(
        strategies: Vec<Box<dyn IconStrategy>>,
        synthesizer: IconSynthesizer,
        max_icon_size: u32,
    ) -> Self {
        Self {
            strategies,
            synthesizer,
            max_icon_size: max_icon_size.max(1),
        }
    }

    /// Resolver with no native strategies; every lookup yields a placeholder.
    pub fn placeholder_only(synthesizer: IconSynthesizer) -> Self {
        Self::new(Vec::new(), synthesizer, PLACEHOLDER_SIZE)
    }

    /// Names of the native strategies in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Icon for `app`: the first native icon found, else the placeholder.
    pub async fn resolve(&self, app: &str) -> EncodedIcon {
        for strategy in &self.strategies {
            match strategy.attempt(app).await {
                Ok(image) => match EncodedIcon::encode(&self.fit(image)) {
                    Ok(icon) => {
                        debug!("Resolved icon for '{}' via {}", app, strategy.name());
                        return icon;
                    }
                    Err(e) => debug!("Failed to encode {} icon for '{}': {}", strategy.name(), app, e),
                },
                Err(e) => trace!("{} found no icon for '{}': {}", strategy.name(), app, e),
            }
        }

        debug!("Using placeholder icon for '{}'", app);
        self.placeholder(app)
    }

    /// Placeholder icon for `app`.
    pub fn placeholder(&self, app: &str) -> EncodedIcon {
        let image = DynamicImage::ImageRgba8(self.synthesizer.synthesize(app));
        EncodedIcon::encode(&image).unwrap_or_else(|e| {
            error!("Failed to encode placeholder icon for '{}': {}", app, e);
            EncodedIcon::default()
        })
    }

    fn fit(&self, image: DynamicImage) -> DynamicImage {
        if image.width() > self.max_icon_size || image.height() > self.max_icon_size {
            image.resize(self.max_icon_size, self.max_icon_size, FilterType::Lanczos3)
        } else {
            image
        }
    }
}

/// Run blocking icon work on the blocking pool, bounded by `deadline`.
pub(crate) async fn run_blocking<T, F>(deadline: Duration, work: F) -> Result<T, StrategyFailure>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StrategyFailure> + Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StrategyFailure::Native(e.to_string())),
        Err(_) => Err(StrategyFailure::TimedOut(deadline)),
    }
}

/// Decode a raster icon file.
pub(crate) fn load_icon_file(path: &Path) -> Result<DynamicImage, StrategyFailure> {
    let image = image::open(path)?;
    trace!("Loaded icon {}", path.display());
    Ok(image)
}
