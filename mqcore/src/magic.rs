/// Name of the environment variable containing the path to the MolQL runtime configuration.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/molql/config.toml` or `$HOME/.config/molql/config.toml`
///  (2) on Windows: `%APPDATA%\molql\config.toml`
pub const ENV_CONFIG_PATH: &str = "MOLQL_CONFIG_PATH";

/// Directory name of the default configuration location.
pub const CONFIG_DIR_NAME: &str = "molql";

/// File name of the default configuration location.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Estimated fill ratio above which a mask is stored as a dense bit set.
pub const DEFAULT_MASK_DENSITY_THRESHOLD: f64 = 1.0 / 12.0;

/// Edge length (in Å) of the cells of the spatial lookup grid.
pub const DEFAULT_LOOKUP_CELL_SIZE: f64 = 4.0;

/// Slack (in Å) added to the sum of covalent radii when inferring bonds.
pub const DEFAULT_BOND_TOLERANCE: f64 = 0.4;

/// Largest ring collected by the ring finder.
pub const DEFAULT_MAX_RING_SIZE: usize = 8;

/// Namespace of the structural value types.
pub const STRUCTURE_NAMESPACE: &str = "Structure";
