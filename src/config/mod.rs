use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::combinator::{Comparison, Predicate};

pub mod error;
pub use error::ConfigError;

pub mod bbox_mode;
pub use bbox_mode::BoundingBoxMode;

pub mod data_type;
pub use data_type::DataType;

const DEFAULT_TILE_SIZE: usize = 256;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Classify,
    MergeMax,
    Clip,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Classify => write!(f, "classify"),
            Operation::MergeMax => write!(f, "merge_max"),
            Operation::Clip => write!(f, "clip"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InputRaster {
    pub name: String,
    pub path: String,
    /// Replaces the file's own nodata value, or supplies one it lacks
    pub nodata: Option<f64>,
}

/// A test applied to the samples of the named input
#[derive(Debug, Clone, PartialEq)]
pub struct RolePredicate {
    pub input: String,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub driver: String,
    /// `None` means: int16 for classification, the first input's type otherwise
    pub data_type: Option<DataType>,
    pub bounding_box_mode: BoundingBoxMode,
    pub pixel_size: Option<f64>,
    pub tile_size: usize,
    pub parallel: bool,
}

impl OutputSettings {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            driver: "GTiff".to_string(),
            data_type: None,
            bounding_box_mode: BoundingBoxMode::default(),
            pixel_size: None,
            tile_size: DEFAULT_TILE_SIZE,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    operation: Operation,
    inputs: Vec<InputRaster>,
    predicates: Vec<RolePredicate>,
    nodata_out: f64,
    search_directory: Option<PathBuf>,
    output: OutputSettings,
}

// Deserializes a Config through a helper struct so that cross-field rules
// (known predicate inputs, operation arity, nodata_out vs data type) are
// checked once, at load time.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            operation: Operation,
            inputs: Vec<InputRaster>,
            #[serde(default)]
            predicates: Vec<PredicateHelper>,
            #[serde(default = "default_nodata_out")]
            nodata_out: f64,
            search_directory: Option<PathBuf>,
            output: OutputHelper,
        }

        #[derive(Deserialize)]
        struct PredicateHelper {
            input: String,
            op: Comparison,
            value: f64,
        }

        #[derive(Deserialize)]
        struct OutputHelper {
            path: PathBuf,
            driver: Option<String>,
            data_type: Option<DataType>,
            #[serde(default)]
            bounding_box_mode: BoundingBoxMode,
            pixel_size: Option<f64>,
            tile_size: Option<usize>,
            #[serde(default)]
            parallel: bool,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        if helper.inputs.is_empty() {
            return Err(D::Error::custom(ConfigError::NoInputs));
        }

        let mut names = HashSet::new();
        for input in &helper.inputs {
            if !names.insert(input.name.as_str()) {
                return Err(D::Error::custom(ConfigError::DuplicateInput(
                    input.name.clone(),
                )));
            }
        }

        let predicates = helper
            .predicates
            .into_iter()
            .map(|p| {
                if names.contains(p.input.as_str()) {
                    Ok(RolePredicate {
                        input: p.input,
                        predicate: Predicate::new(p.op, p.value),
                    })
                } else {
                    Err(D::Error::custom(ConfigError::UnknownInput(p.input)))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        match helper.operation {
            Operation::Classify if helper.nodata_out == 0.0 || helper.nodata_out == 1.0 => {
                return Err(D::Error::custom(ConfigError::AmbiguousNodataOut(
                    helper.nodata_out,
                )));
            }
            Operation::MergeMax | Operation::Clip if !predicates.is_empty() => {
                return Err(D::Error::custom(ConfigError::PredicatesNotAllowed(
                    helper.operation,
                )));
            }
            Operation::Clip if helper.inputs.len() != 2 => {
                return Err(D::Error::custom(ConfigError::ClipArity(
                    helper.inputs.len(),
                )));
            }
            _ => {}
        }

        let output = helper.output;

        let tile_size = output.tile_size.unwrap_or(DEFAULT_TILE_SIZE);
        if tile_size == 0 {
            return Err(D::Error::custom(ConfigError::TileSize));
        }

        if let Some(size) = output.pixel_size
            && !(size.is_finite() && size > 0.0)
        {
            return Err(D::Error::custom(ConfigError::PixelSize(size)));
        }

        if let Some(data_type) = output.data_type
            && !data_type.can_represent(helper.nodata_out)
        {
            return Err(D::Error::custom(ConfigError::NodataOutType(
                helper.nodata_out,
                data_type,
            )));
        }

        Ok(Config {
            operation: helper.operation,
            inputs: helper.inputs,
            predicates,
            nodata_out: helper.nodata_out,
            search_directory: helper.search_directory,
            output: OutputSettings {
                path: output.path,
                driver: output.driver.unwrap_or_else(|| "GTiff".to_string()),
                data_type: output.data_type,
                bounding_box_mode: output.bounding_box_mode,
                pixel_size: output.pixel_size,
                tile_size,
                parallel: output.parallel,
            },
        })
    }
}

impl Config {
    pub fn new(operation: Operation, inputs: Vec<InputRaster>, output: OutputSettings) -> Self {
        Self {
            operation,
            inputs,
            predicates: Vec::new(),
            nodata_out: default_nodata_out(),
            search_directory: None,
            output,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn with_predicate(mut self, input: &str, predicate: Predicate) -> Self {
        self.predicates.push(RolePredicate {
            input: input.to_string(),
            predicate,
        });
        self
    }

    pub fn with_nodata_out(mut self, nodata_out: f64) -> Self {
        self.nodata_out = nodata_out;
        self
    }

    pub fn with_search_directory<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.search_directory = Some(dir.into());
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn inputs(&self) -> &[InputRaster] {
        &self.inputs
    }

    pub fn predicates(&self) -> &[RolePredicate] {
        &self.predicates
    }

    pub fn nodata_out(&self) -> f64 {
        self.nodata_out
    }

    pub fn search_directory(&self) -> Option<&Path> {
        self.search_directory.as_deref()
    }

    pub fn output(&self) -> &OutputSettings {
        &self.output
    }
}

fn default_nodata_out() -> f64 {
    -1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const GRASSLANDS: &str = r#"
    {
        "operation": "classify",
        "inputs": [
            {"name": "lulc", "path": "/data/landcover.tif", "nodata": 255},
            {"name": "dem", "path": "/shared/joined_reprojected_dem.tif"},
            {"name": "stream_distance", "path": "/shared/euclidean_dist_to_streams.tif"}
        ],
        "predicates": [
            {"input": "lulc", "op": "eq", "value": 10},
            {"input": "dem", "op": "ge", "value": 2000},
            {"input": "stream_distance", "op": "le", "value": 300}
        ],
        "nodata_out": -1,
        "output": {
            "path": "/shared/high_elev_riparian_grasslands.tif",
            "data_type": "int16",
            "bounding_box_mode": "intersection"
        }
    }
    "#;

    fn parse(json: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(GRASSLANDS.as_bytes()).unwrap();

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.operation(), Operation::Classify);
        assert_eq!(config.inputs().len(), 3);
        assert_eq!(config.inputs()[0].nodata, Some(255.0));
        assert_eq!(config.inputs()[1].nodata, None);
        assert_eq!(config.predicates()[1].input, "dem");
        assert_eq!(config.predicates()[1].predicate, Predicate::at_least(2000.0));
        assert_eq!(config.nodata_out(), -1.0);

        let output = config.output();
        assert_eq!(output.data_type, Some(DataType::Int16));
        assert_eq!(output.bounding_box_mode, BoundingBoxMode::Intersection);
        assert_eq!(output.driver, "GTiff");
        assert_eq!(output.tile_size, 256);
        assert!(!output.parallel);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/config.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_unknown_predicate_input() {
        let json = GRASSLANDS.replace(r#""input": "dem""#, r#""input": "slope""#);
        let err = parse(&json).unwrap_err();
        assert!(err.to_string().contains("unknown input 'slope'"));
    }

    #[test]
    fn test_duplicate_input() {
        let json = GRASSLANDS.replace(r#""name": "dem""#, r#""name": "lulc""#);
        let err = parse(&json).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_ambiguous_nodata_out() {
        let json = GRASSLANDS.replace(r#""nodata_out": -1"#, r#""nodata_out": 1"#);
        assert!(parse(&json).is_err());
    }

    #[test]
    fn test_nodata_out_must_fit_data_type() {
        let json = GRASSLANDS.replace(r#""data_type": "int16""#, r#""data_type": "byte""#);
        let err = parse(&json).unwrap_err();
        assert!(err.to_string().contains("cannot be stored as byte"));
    }

    #[test]
    fn test_zero_tile_size() {
        let json = GRASSLANDS.replace(r#""data_type": "int16""#, r#""tile_size": 0"#);
        assert!(parse(&json).is_err());
    }

    #[test]
    fn test_clip_arity() {
        let json = r#"
        {
            "operation": "clip",
            "inputs": [{"name": "lulc", "path": "lulc.tif"}],
            "output": {"path": "clipped.tif"}
        }
        "#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("exactly 2 inputs"));
    }

    #[test]
    fn test_merge_defaults() {
        let json = r#"
        {
            "operation": "merge_max",
            "inputs": [{"name": "dem", "path": "ASTGTM2_*_dem.tif"}],
            "output": {"path": "joined_dem.tif", "bounding_box_mode": "union", "parallel": true}
        }
        "#;
        let config = parse(json).unwrap();

        assert_eq!(config.operation(), Operation::MergeMax);
        assert_eq!(config.nodata_out(), -1.0);
        assert!(config.predicates().is_empty());
        assert_eq!(config.output().bounding_box_mode, BoundingBoxMode::Union);
        assert_eq!(config.output().data_type, None);
        assert!(config.output().parallel);
    }

    #[test]
    fn test_builder_matches_defaults() {
        let config = Config::new(
            Operation::Classify,
            vec![InputRaster {
                name: "dem".to_string(),
                path: "dem.tif".to_string(),
                nodata: Some(-9999.0),
            }],
            OutputSettings::new("out.tif"),
        )
        .with_predicate("dem", Predicate::at_least(3500.0))
        .with_nodata_out(-2.0)
        .with_search_directory("/shared");

        assert_eq!(config.nodata_out(), -2.0);
        assert_eq!(config.search_directory(), Some(Path::new("/shared")));
        assert_eq!(config.predicates().len(), 1);
        assert_eq!(config.output().tile_size, 256);
    }

    #[test]
    fn test_predicates_only_for_classify() {
        let json = r#"
        {
            "operation": "merge_max",
            "inputs": [{"name": "dem", "path": "ASTGTM2_*_dem.tif"}],
            "predicates": [{"input": "dem", "op": "ge", "value": 3500}],
            "output": {"path": "joined_dem.tif"}
        }
        "#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("predicates only apply to classify, not merge_max"));
    }
}
