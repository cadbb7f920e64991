//! Coordinate reference systems carried by layers.
//!
//! The systems the source archives use most (WGS84, geographic systems on
//! GRS80-family datums, Web Mercator and UTM zones on WGS84 or SIRGAS 2000)
//! are modelled explicitly so they can be recognised from ESRI-style WKT
//! without an authority clause. Any other EPSG code is kept as
//! [`Crs::Epsg`] and resolved against the PROJ definitions bundled with
//! `proj4rs` when the layer is reprojected. WKT that names neither parses
//! to [`Crs::Unsupported`] so the caller can fail the layer with a useful
//! identifier.

/// Reference ellipsoid of a projected system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ellipsoid {
    /// WGS 84.
    Wgs84,
    /// GRS 1980, used by SIRGAS 2000, ETRS89 and NAD83.
    Grs80,
}

impl Ellipsoid {
    /// Semi-major axis in metres.
    pub const fn semi_major_axis(self) -> f64 {
        match self {
            Self::Wgs84 | Self::Grs80 => 6_378_137.0,
        }
    }

    /// PROJ `+ellps` and datum parameters for the ellipsoid.
    ///
    /// GRS80 datums are tied to WGS84 with a null Helmert shift, matching
    /// the EPSG definitions of SIRGAS 2000, ETRS89 and NAD83.
    pub const fn proj_parameters(self) -> &'static str {
        match self {
            Self::Wgs84 => "+datum=WGS84",
            Self::Grs80 => "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0",
        }
    }
}

/// Radius of the sphere Web Mercator projects from.
pub const WEB_MERCATOR_RADIUS: f64 = Ellipsoid::Wgs84.semi_major_axis();

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Northern hemisphere, false northing 0.
    North,
    /// Southern hemisphere, false northing 10 000 km.
    South,
}

impl Hemisphere {
    /// Single-letter suffix used in zone names such as `21S`.
    pub const fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
        }
    }
}

/// Coordinate reference system tag carried by a [`crate::Layer`].
///
/// # Examples
/// ```
/// use strata_core::{Crs, Ellipsoid, Hemisphere};
///
/// assert_eq!(Crs::from_epsg(4326), Crs::Wgs84);
/// assert_eq!(
///     Crs::from_epsg(31981),
///     Crs::TransverseMercator {
///         zone: 21,
///         hemisphere: Hemisphere::South,
///         ellipsoid: Ellipsoid::Grs80,
///     }
/// );
/// assert_eq!(Crs::from_epsg(2154), Crs::Epsg(2154));
/// assert!(Crs::from_wkt("LOCAL_CS[\"plant grid\"]").is_unsupported());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// WGS 84 longitude/latitude in degrees.
    Wgs84,
    /// Geographic longitude/latitude on a datum treated as WGS84-compatible.
    Geographic {
        /// Datum name as found in the source.
        datum: String,
    },
    /// Spherical Web Mercator (EPSG:3857).
    WebMercator,
    /// Universal Transverse Mercator zone.
    TransverseMercator {
        /// UTM zone number, 1 to 60.
        zone: u8,
        /// Hemisphere selecting the false northing.
        hemisphere: Hemisphere,
        /// Ellipsoid of the datum.
        ellipsoid: Ellipsoid,
    },
    /// Any other EPSG system, resolved through its registered PROJ
    /// definition.
    Epsg(u16),
    /// A system the pipeline cannot identify.
    Unsupported(String),
}

impl Crs {
    /// Map an EPSG code onto a system.
    ///
    /// Codes outside the explicitly modelled systems become [`Crs::Epsg`];
    /// whether PROJ knows them is only checked at reprojection.
    pub fn from_epsg(code: u32) -> Self {
        match code {
            4326 => Self::Wgs84,
            4674 => Self::geographic("SIRGAS 2000"),
            4258 => Self::geographic("ETRS89"),
            4269 => Self::geographic("NAD83"),
            3857 | 3785 | 900_913 | 102_100 => Self::WebMercator,
            32601..=32660 => Self::utm(code - 32600, Hemisphere::North, Ellipsoid::Wgs84),
            32701..=32760 => Self::utm(code - 32700, Hemisphere::South, Ellipsoid::Wgs84),
            31965..=31976 => Self::utm(code - 31954, Hemisphere::North, Ellipsoid::Grs80),
            31977..=31985 => Self::utm(code - 31960, Hemisphere::South, Ellipsoid::Grs80),
            25828..=25838 => Self::utm(code - 25800, Hemisphere::North, Ellipsoid::Grs80),
            other => u16::try_from(other)
                .map_or_else(|_| Self::Unsupported(format!("EPSG:{other}")), Self::Epsg),
        }
    }

    /// Parse the WKT stored in a shapefile `.prj` sidecar.
    ///
    /// An `AUTHORITY["EPSG", ...]` (or WKT2 `ID["EPSG", ...]`) on the root
    /// element wins. Otherwise the root name is matched against the ESRI
    /// spellings of the supported systems.
    ///
    /// # Examples
    /// ```
    /// use strata_core::{Crs, Hemisphere};
    ///
    /// let wkt = r#"PROJCS["SIRGAS_2000_UTM_Zone_21S",GEOGCS["GCS_SIRGAS_2000",
    ///     DATUM["D_SIRGAS_2000",SPHEROID["GRS_1980",6378137.0,298.257222101]]],
    ///     PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;
    /// let crs = Crs::from_wkt(wkt);
    /// assert!(matches!(
    ///     crs,
    ///     Crs::TransverseMercator { zone: 21, hemisphere: Hemisphere::South, .. }
    /// ));
    /// ```
    pub fn from_wkt(wkt: &str) -> Self {
        let wkt = wkt.trim();
        let Some((keyword, name)) = root_element(wkt) else {
            return Self::Unsupported(format!("unparseable WKT: {}", abbreviate(wkt)));
        };
        if let Some(code) = root_epsg_code(wkt) {
            return Self::from_epsg(code);
        }
        let normalised = normalise(&name);
        match keyword.as_str() {
            "GEOGCS" | "GEOGCRS" | "GEODCRS" => geographic_from_name(&name, &normalised),
            "PROJCS" | "PROJCRS" => projected_from_name(wkt, &name, &normalised),
            _ => Self::Unsupported(name),
        }
    }

    /// Whether coordinates in this system are already WGS84 degrees for the
    /// pipeline's purposes.
    pub const fn is_wgs84_compatible(&self) -> bool {
        matches!(self, Self::Wgs84 | Self::Geographic { .. })
    }

    /// PROJ definition of an explicitly modelled projected system.
    ///
    /// Geographic systems, [`Crs::Epsg`] and [`Crs::Unsupported`] return
    /// `None`.
    ///
    /// # Examples
    /// ```
    /// use strata_core::Crs;
    ///
    /// assert_eq!(
    ///     Crs::from_epsg(32721).proj_definition().as_deref(),
    ///     Some("+proj=utm +zone=21 +south +datum=WGS84 +units=m +no_defs")
    /// );
    /// ```
    pub fn proj_definition(&self) -> Option<String> {
        match self {
            Self::WebMercator => Some(format!(
                "+proj=merc +a={WEB_MERCATOR_RADIUS} +b={WEB_MERCATOR_RADIUS} +lat_ts=0 \
                 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
            )),
            Self::TransverseMercator {
                zone,
                hemisphere,
                ellipsoid,
            } => {
                let south = match hemisphere {
                    Hemisphere::North => "",
                    Hemisphere::South => " +south",
                };
                Some(format!(
                    "+proj=utm +zone={zone}{south} {} +units=m +no_defs",
                    ellipsoid.proj_parameters()
                ))
            }
            Self::Wgs84 | Self::Geographic { .. } | Self::Epsg(_) | Self::Unsupported(_) => None,
        }
    }

    /// Whether the system is [`Crs::Unsupported`].
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    fn geographic(datum: &str) -> Self {
        Self::Geographic {
            datum: datum.to_owned(),
        }
    }

    fn utm(zone: u32, hemisphere: Hemisphere, ellipsoid: Ellipsoid) -> Self {
        match u8::try_from(zone) {
            Ok(zone) if (1..=60).contains(&zone) => Self::TransverseMercator {
                zone,
                hemisphere,
                ellipsoid,
            },
            _ => Self::Unsupported(format!("UTM zone {zone}{}", hemisphere.letter())),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wgs84 => f.write_str("WGS 84"),
            Self::Geographic { datum } => write!(f, "{datum} (geographic)"),
            Self::WebMercator => f.write_str("Web Mercator"),
            Self::TransverseMercator {
                zone,
                hemisphere,
                ellipsoid,
            } => {
                let datum = match ellipsoid {
                    Ellipsoid::Wgs84 => "WGS 84",
                    Ellipsoid::Grs80 => "GRS 80",
                };
                write!(f, "{datum} / UTM zone {zone}{}", hemisphere.letter())
            }
            Self::Epsg(code) => write!(f, "EPSG:{code}"),
            Self::Unsupported(identifier) => write!(f, "unsupported CRS {identifier}"),
        }
    }
}

/// Return the root keyword and its quoted name.
fn root_element(wkt: &str) -> Option<(String, String)> {
    let open = wkt.find('[')?;
    let keyword = wkt.get(..open)?.trim().to_ascii_uppercase();
    if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let rest = wkt.get(open + 1..)?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let close = rest.find('"')?;
    Some((keyword, rest.get(..close)?.to_owned()))
}

/// Find the EPSG code attached to the root element.
///
/// Nested elements such as `GEOGCS` or `UNIT` carry their own authority
/// clauses, so only a clause at bracket depth one counts.
fn root_epsg_code(wkt: &str) -> Option<u32> {
    let mut depth = 0_usize;
    let mut in_quotes = false;
    let mut found = None;
    for (offset, ch) in wkt.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes => {
                if depth == 1 {
                    let head = wkt.get(..offset).unwrap_or_default();
                    let start = head
                        .rfind(|c: char| c == ',' || c == '[' || c == '(')
                        .map_or(0, |idx| idx + 1);
                    let keyword = head.get(start..).unwrap_or_default().trim();
                    if keyword.eq_ignore_ascii_case("AUTHORITY") || keyword.eq_ignore_ascii_case("ID")
                    {
                        found = wkt.get(offset + 1..).and_then(parse_authority_body);
                    }
                }
                depth += 1;
            }
            ']' | ')' if !in_quotes => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    found
}

/// Parse `"EPSG","32721"]` or `"EPSG",32721]`.
fn parse_authority_body(body: &str) -> Option<u32> {
    let end = body.find([']', ')'])?;
    let mut parts = body.get(..end)?.split(',');
    let authority = parts.next()?.trim().trim_matches('"');
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    parts.next()?.trim().trim_matches('"').parse().ok()
}

fn normalise(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '-'], " ")
}

fn geographic_from_name(name: &str, normalised: &str) -> Crs {
    let compact = normalised.replace(' ', "");
    if compact.contains("wgs84") || compact.contains("wgs1984") {
        Crs::Wgs84
    } else if ["sirgas", "etrs", "nad83", "north american 1983", "grs 1980"]
        .iter()
        .any(|datum| normalised.contains(datum))
    {
        Crs::geographic(name)
    } else {
        Crs::Unsupported(name.to_owned())
    }
}

fn projected_from_name(wkt: &str, name: &str, normalised: &str) -> Crs {
    let upper = wkt.to_ascii_uppercase();
    if ["web mercator", "pseudo mercator", "mercator auxiliary sphere"]
        .iter()
        .any(|marker| normalised.contains(marker))
        || upper.contains("MERCATOR_AUXILIARY_SPHERE")
        || upper.contains("POPULAR VISUALISATION PSEUDO MERCATOR")
    {
        return Crs::WebMercator;
    }
    let Some((zone, hemisphere)) = utm_zone_from_name(normalised) else {
        return Crs::Unsupported(name.to_owned());
    };
    let compact = normalised.replace(' ', "");
    let ellipsoid = if compact.contains("wgs84") || compact.contains("wgs1984") {
        Ellipsoid::Wgs84
    } else if ["sirgas", "etrs", "nad83"]
        .iter()
        .any(|datum| normalised.contains(datum))
    {
        Ellipsoid::Grs80
    } else {
        return Crs::Unsupported(name.to_owned());
    };
    Crs::utm(u32::from(zone), hemisphere, ellipsoid)
}

/// Extract `(zone, hemisphere)` from names such as `utm zone 21s`.
fn utm_zone_from_name(normalised: &str) -> Option<(u8, Hemisphere)> {
    let (_, tail) = normalised.split_once("utm zone")?;
    let tail = tail.trim_start();
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    let zone = digits.parse().ok()?;
    let hemisphere = match tail.get(digits.len()..)?.trim_start().chars().next()? {
        'n' => Hemisphere::North,
        's' => Hemisphere::South,
        _ => return None,
    };
    Some((zone, hemisphere))
}

fn abbreviate(wkt: &str) -> String {
    wkt.chars().take(40).collect()
}
