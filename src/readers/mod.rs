pub mod gdal_io;
pub mod geotiff;
pub mod memory;
pub mod types;
pub mod utils;

pub use gdal_io::GdalRaster;
pub use geotiff::GeoTiffReader;
pub use memory::MemRaster;
pub use types::{BlockSource, Data, DataReader, FileError, FileType, RasterInfo, ReadError};
pub use utils::{reader_from_filetype, resolve_paths};

use std::path::Path;

pub fn create_reader(file_name: &Path) -> Result<Box<dyn DataReader>, FileError> {
    match reader_from_filetype(file_name) {
        Ok(FileType::GeoTiff) => Ok(Box::new(GeoTiffReader::new(file_name))),
        Err(e) => Err(e),
    }
}

/// Load a whole raster into memory through the pure-Rust reader
pub fn load_in_memory(path: &Path, name: &str) -> crate::Result<MemRaster> {
    let reader = create_reader(path)
        .map_err(|_| ReadError::UnsupportedLayout(format!("{}: not a GeoTIFF", path.display())))?;
    let data = reader.read_data()?;
    MemRaster::from_data(name, data)
}
