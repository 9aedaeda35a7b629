use crate::core::constants::TILE_SIZE;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested tile.
    fn url(&self, zoom: u8, x: u32, y: u32) -> String;

    /// Pixel size of the square tiles this source serves.
    fn tile_size(&self) -> u32 {
        TILE_SIZE
    }
}

/// Simple implementation that hits the default OpenStreetMap tile server.
pub struct OpenStreetMapSource {
    subdomains: Vec<&'static str>,
}

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self {
            subdomains: vec!["a", "b", "c"],
        }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, zoom: u8, x: u32, y: u32) -> String {
        if self.subdomains.is_empty() {
            return format!("https://tile.openstreetmap.org/{}/{}/{}.png", zoom, x, y);
        }

        let sub = self.subdomains[subdomain_index(x, y, self.subdomains.len())];
        format!(
            "https://{}.tile.openstreetmap.org/{}/{}/{}.png",
            sub, zoom, x, y
        )
    }
}

/// URL template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders
#[derive(Debug, Clone)]
pub struct UrlTemplateSource {
    template: String,
    subdomains: Vec<String>,
    tile_size: u32,
}

impl UrlTemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
            tile_size: TILE_SIZE,
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, zoom: u8, x: u32, y: u32) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            &self.subdomains[subdomain_index(x, y, self.subdomains.len())]
        };

        self.template
            .replace("{s}", subdomain)
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

/// Spread neighbouring tiles over the available subdomains
fn subdomain_index(x: u32, y: u32, count: usize) -> usize {
    ((x as u64 + y as u64) % count as u64) as usize
}
