//! Tile path grammar and coordinate conventions.

/// A parsed tile request path, before the row flip.
///
/// Ephemeral per-request data; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePath {
    /// Project name exactly as given in the path.
    pub project: String,
    pub zoom: i64,
    pub col: i64,
    /// Row as requested (TMS convention, counted from the bottom).
    pub row: i64,
    /// Requested image format (the path's file extension).
    pub format: String,
}

/// Parse a path of the shape `/{project}/{zoom}/{col}/{row}.{format}`.
///
/// The project segment is ASCII alphanumeric plus `.` and `_`; zoom, column
/// and row are decimal digits; the format is alphanumeric. Anything else is
/// a parse failure and `None` is returned.
pub fn parse_path(path: &str) -> Option<TilePath> {
    let mut segments = path.strip_prefix('/')?.split('/');

    let project = segments.next()?;
    let zoom = segments.next()?;
    let col = segments.next()?;
    let filename = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    if project.is_empty()
        || !project
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_')
    {
        return None;
    }

    let (row, format) = filename.rsplit_once('.')?;
    if format.is_empty() || !format.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }

    Some(TilePath {
        project: project.to_string(),
        zoom: parse_digits(zoom)?,
        col: parse_digits(col)?,
        row: parse_digits(row)?,
        format: format.to_string(),
    })
}

/// Parse a non-empty all-digits segment.
fn parse_digits(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Flip a row index between the TMS and XYZ conventions.
///
/// `row' = 2^zoom - 1 - row`, saturating for zoom levels past the width of
/// the coordinate type. The flip is its own inverse within bounds.
pub fn flip_row(zoom: i64, row: i64) -> i64 {
    let grid = match u32::try_from(zoom).ok().filter(|&z| z < 63) {
        Some(zoom) => 1i64 << zoom,
        None => i64::MAX,
    };
    grid.saturating_sub(1).saturating_sub(row)
}

/// Content type for a served image format.
pub fn mime_type(format: &str) -> &'static str {
    match format {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Normalize a configured path prefix: empty stays empty, anything else gets
/// a leading slash and no trailing slash.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() || prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    }
}

// =============================================================================
// Tests
// =============================================================================
