
use std::io::{BufWriter, Read, Write};
use std::fs::File;
use std::path::Path;

/// Opens a file for reading, transparently decompressing anything ending in ".gz"
/// # Arguments
/// * `filename` - the file path to open
/// # Errors
/// * if the file does not open properly
fn open_reader(filename: &Path) -> Result<Box<dyn Read>, Box<dyn std::error::Error>> {
    let fp: Box<dyn Read> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(
            flate2::read::MultiGzDecoder::new(
                File::open(filename)?
            )
        )
    } else {
        Box::new(File::open(filename)?)
    };
    Ok(fp)
}

/// Helper function that loads a file into some type, helpful generic
/// # Arguments
/// * `filename` - the file path to open and parse
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let fp = open_reader(filename)?;
    let result: T = serde_json::from_reader(fp)?;
    Ok(result)
}

/// This will save a generic serializable struct to JSON.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file: Box<dyn std::io::Write> = if out_filename.extension().unwrap_or_default() == "gz" {
        Box::new(
            flate2::write::GzEncoder::new(
                File::create(out_filename)?,
                flate2::Compression::best()
            )
        )
    } else {
        Box::new(File::create(out_filename)?)
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.flush()?;
    Ok(())
}

/// Reads an entire text file into memory, decompressing ".gz" files
/// # Arguments
/// * `filename` - the file path to read
/// # Errors
/// * if the file does not open properly
/// * if the content is not valid UTF-8
pub fn load_text(filename: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let mut fp = open_reader(filename)?;
    let mut text: String = Default::default();
    fp.read_to_string(&mut text)?;
    Ok(text)
}
