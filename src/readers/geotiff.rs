use super::{Data, DataReader, ReadError};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
const GEOTIFF_MODELTIEPOINT: u16 = 33922;
const GDAL_NODATA: u16 = 42113;

/// Pure-Rust whole-image reader for single-band GeoTIFFs
pub struct GeoTiffReader {
    pub file_name: PathBuf,
}

impl GeoTiffReader {
    pub fn new<P: Into<PathBuf>>(file_name: P) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

fn read_geo_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<[f64; 6]>, ReadError> {
    let scale = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE))
        .map_err(|e| ReadError::GeoTiff(format!("Failed to read pixel scale: {}", e)))?;
    let tiepoint = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT))
        .map_err(|e| ReadError::GeoTiff(format!("Failed to read tiepoint: {}", e)))?;

    let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
        return Ok(None);
    };

    let scale = scale
        .into_f64_vec()
        .map_err(|e| ReadError::GeoTiff(format!("Invalid pixel scale: {}", e)))?;
    let tiepoint = tiepoint
        .into_f64_vec()
        .map_err(|e| ReadError::GeoTiff(format!("Invalid tiepoint: {}", e)))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(ReadError::GeoTiff(
            "Truncated georeferencing tags".to_string(),
        ));
    }

    // Tiepoint [I, J, K, X, Y, Z] ties raster (I, J) to model (X, Y)
    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);

    Ok(Some([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]))
}

fn read_nodata<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<f64>, ReadError> {
    let Some(value) = decoder
        .find_tag(Tag::Unknown(GDAL_NODATA))
        .map_err(|e| ReadError::GeoTiff(format!("Failed to read nodata tag: {}", e)))?
    else {
        return Ok(None);
    };

    let text = value
        .into_string()
        .map_err(|e| ReadError::GeoTiff(format!("Invalid nodata tag: {}", e)))?;
    let text = text.trim_matches(char::from(0)).trim();

    match text.to_ascii_lowercase().as_str() {
        "nan" => Ok(Some(f64::NAN)),
        other => other
            .parse::<f64>()
            .map(Some)
            .map_err(|e| ReadError::GeoTiff(format!("Invalid nodata value '{}': {}", text, e))),
    }
}

impl DataReader for GeoTiffReader {
    fn read_data(&self) -> Result<Data, ReadError> {
        let file = File::open(&self.file_name)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to open file: {}", e)))?;

        let reader = BufReader::new(file);

        let mut decoder = Decoder::new(reader)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to decode TIFF: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to get dimensions: {}", e)))?;

        let color_type = decoder
            .colortype()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to get color type: {}", e)))?;
        if !matches!(color_type, ColorType::Gray(_)) {
            return Err(ReadError::UnsupportedLayout(format!(
                "{}: expected a single band, found {:?}",
                self.file_name.display(),
                color_type
            )));
        }

        let geo_transform = read_geo_transform(&mut decoder)?;
        let nodata = read_nodata(&mut decoder)?;

        let buffer: Vec<f64> = match decoder
            .read_image()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to read image: {}", e)))?
        {
            DecodingResult::U8(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::U16(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::U32(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::I8(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::I16(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::I32(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::F32(data) => data.iter().map(|&x| x as f64).collect(),
            DecodingResult::F64(data) => data,
            _ => return Err(ReadError::GeoTiff("Unsupported pixel format".to_string())),
        };

        Ok(Data {
            width,
            height,
            buffer,
            nodata,
            geo_transform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tiff::encoder::{TiffEncoder, colortype::Gray32Float};

    #[test]
    fn test_reads_samples_georeferencing_and_nodata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dem.tif");

        let samples: Vec<f32> = vec![1800.0, 2100.0, -9999.0, 3600.0, 3400.0, 2000.0];
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            let mut image = encoder.new_image::<Gray32Float>(3, 2).unwrap();
            image
                .encoder()
                .write_tag(
                    Tag::Unknown(GEOTIFF_MODELPIXELSCALE),
                    [30.0f64, 30.0, 0.0].as_slice(),
                )
                .unwrap();
            image
                .encoder()
                .write_tag(
                    Tag::Unknown(GEOTIFF_MODELTIEPOINT),
                    [0.0f64, 0.0, 0.0, 250000.0, 4200000.0, 0.0].as_slice(),
                )
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA), "-9999")
                .unwrap();
            image.write_data(&samples).unwrap();
        }

        let data = GeoTiffReader::new(&path).read_data().unwrap();

        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.buffer[3], 3600.0);
        assert_eq!(data.nodata, Some(-9999.0));
        assert_eq!(
            data.geo_transform,
            Some([250000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0])
        );

        let summary = data.to_string();
        assert!(summary.contains("Min value: 1800"));
        assert!(summary.contains("Max value: 3600"));
    }

    #[test]
    fn test_missing_file() {
        let reader = GeoTiffReader::new("/nonexistent/dem.tif");
        assert!(matches!(reader.read_data(), Err(ReadError::GeoTiff(_))));
    }
}
