//! Whole-raster driver: plans the output grid, feeds the combinator
//! aligned blocks tile by tile and writes the results.

pub mod batch_runner;
pub mod plan;

pub use batch_runner::{RunOptions, RunSummary, execute};
pub use plan::{OutputGrid, Plan, plan};

use std::collections::HashMap;
use std::fmt::Display;
use tracing::info;

use crate::combinator::{BlockOp, BoundPredicate, Classifier, Clip, MaxMerge};
use crate::config::{BoundingBoxMode, Config, ConfigError, DataType, Operation};
use crate::error::Result;
use crate::readers::{BlockSource, GdalRaster, resolve_paths};
use crate::writers::{BlockSink, OutputSpec, write_output};

/// Plan and execute in one go, writing into any sink.
pub fn calculate(
    sources: &[&dyn BlockSource],
    op: &dyn BlockOp,
    mode: BoundingBoxMode,
    pixel_size: Option<f64>,
    options: RunOptions,
    sink: &mut dyn BlockSink,
) -> Result<RunSummary> {
    let plan = plan(sources, mode, pixel_size)?;
    execute(&plan, sources, op, options, sink)
}

/// A configured run: input rasters opened through GDAL, one operation, one
/// output raster.
pub struct Pipeline {
    config: Config,
    sources: Vec<GdalRaster>,
    // input name -> position of its first source
    roles: HashMap<String, usize>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let mut sources = Vec::new();
        let mut roles = HashMap::new();

        for input in config.inputs() {
            let paths = resolve_paths(&input.path, config.search_directory())?;
            if paths.len() > 1 && config.operation() != Operation::MergeMax {
                return Err(ConfigError::AmbiguousInput(input.name.clone(), paths.len()).into());
            }

            roles.insert(input.name.clone(), sources.len());
            for (i, path) in paths.iter().enumerate() {
                let name = if paths.len() > 1 {
                    format!("{}[{}]", input.name, i)
                } else {
                    input.name.clone()
                };
                sources.push(GdalRaster::open(path, &name, input.nodata)?);
            }
        }

        Ok(Self {
            config,
            sources,
            roles,
        })
    }

    pub fn sources(&self) -> &[GdalRaster] {
        &self.sources
    }

    fn build_op(&self, nodata: Vec<f64>) -> Result<Box<dyn BlockOp>> {
        let nodata_out = self.config.nodata_out();
        let operation = self.config.operation();
        if operation != Operation::Classify && !self.config.predicates().is_empty() {
            return Err(ConfigError::PredicatesNotAllowed(operation).into());
        }

        let op: Box<dyn BlockOp> = match operation {
            Operation::Classify => {
                let predicates = self
                    .config
                    .predicates()
                    .iter()
                    .map(|p| {
                        self.roles
                            .get(&p.input)
                            .map(|&index| BoundPredicate::new(index, p.predicate))
                            .ok_or_else(|| ConfigError::UnknownInput(p.input.clone()))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Box::new(Classifier::new(nodata, predicates, nodata_out)?)
            }
            Operation::MergeMax => Box::new(MaxMerge::new(nodata, nodata_out)?),
            Operation::Clip => {
                if nodata.len() != 2 {
                    return Err(ConfigError::ClipArity(nodata.len()).into());
                }
                Box::new(Clip::new(nodata[0], nodata[1], nodata_out))
            }
        };
        Ok(op)
    }

    fn output_data_type(&self) -> DataType {
        let output = self.config.output();
        match (output.data_type, self.config.operation()) {
            (Some(data_type), _) => data_type,
            (None, Operation::Classify) => DataType::Int16,
            (None, _) => self
                .sources
                .first()
                .and_then(|s| s.info().data_type)
                .unwrap_or(DataType::Float64),
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let output = self.config.output();
        let sources: Vec<&dyn BlockSource> =
            self.sources.iter().map(|s| s as &dyn BlockSource).collect();

        let plan = plan(&sources, output.bounding_box_mode, output.pixel_size)?;
        let op = self.build_op(plan.nodata.clone())?;

        let spec = OutputSpec {
            driver: output.driver.clone(),
            data_type: self.output_data_type(),
            nodata: self.config.nodata_out(),
            block_size: Some(output.tile_size),
        };
        let options = RunOptions {
            tile_size: output.tile_size,
            parallel: output.parallel,
        };
        let summary = write_output(&output.path, &plan.grid, &spec, |sink| {
            execute(&plan, &sources, op.as_ref(), options, sink)
        })?;

        info!(
            "{} wrote {} ({} tiles, {} nodata pixels)",
            op.name(),
            output.path.display(),
            summary.tiles,
            summary.nodata_pixels
        );

        Ok(summary)
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline {{ operation: {:?}, inputs: {}, output: {} }}",
            self.config.operation(),
            self.sources.len(),
            self.config.output().path.display()
        )
    }
}
