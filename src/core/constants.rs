//! Physical constants and survey defaults

/// Mean earth radius used by the spherical formulas (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 semi-major axis (m)
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;

/// WGS84 first eccentricity squared
pub const WGS84_ECCENTRICITY_SQUARED: f64 = 2.0 * WGS84_FLATTENING - WGS84_FLATTENING * WGS84_FLATTENING;

/// Transverse Mercator scale factor on the central meridian
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// False easting applied in every zone (m)
pub const UTM_FALSE_EASTING_M: f64 = 500_000.0;

/// False northing applied in the southern hemisphere (m)
pub const UTM_FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;

/// Equirectangular scale for longitude used by the approximate projector (m/deg)
pub const APPROX_METERS_PER_DEGREE_LNG: f64 = 111_320.0;

/// Equirectangular scale for latitude used by the approximate projector (m/deg)
pub const APPROX_METERS_PER_DEGREE_LAT: f64 = 110_574.0;

/// Default rotation for a corner turn (degrees)
pub const DEFAULT_CORNER_ANGLE_DEG: f64 = 90.0;

/// Width of one compass sector in the 16-point rose (degrees)
pub const COMPASS_SECTOR_DEG: f64 = 22.5;

/// Square meters per hectare
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Square meters per international acre
pub const SQUARE_METERS_PER_ACRE: f64 = 4_046.856_422_4;
