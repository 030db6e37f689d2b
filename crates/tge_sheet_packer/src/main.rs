use image::RgbaImage;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_HEADER: &str = "name,x,y,width,height";
const PADDING: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
struct SheetEntry {
    name: String,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

fn usage() -> String {
    "Usage:\n  tge_sheet_packer pack <input_dir> <output_png> [sheet_size]\n  tge_sheet_packer xml2csv <input.xml> <output.spritesheet>\nExample: cargo run -p tge_sheet_packer -- pack art/ships resource/texture/ships.png 512".to_string()
}

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("pack") if args.len() == 4 || args.len() == 5 => {
            let size = match args.get(4) {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|e| format!("Invalid sheet_size '{raw}': {e}"))?,
                None => 512,
            };
            pack_command(Path::new(&args[2]), Path::new(&args[3]), size)
        }
        Some("xml2csv") if args.len() == 4 => {
            xml2csv_command(Path::new(&args[2]), Path::new(&args[3]))
        }
        _ => Err(usage()),
    }
}

fn pack_command(input_dir: &Path, output_png: &Path, sheet_size: u32) -> Result<(), String> {
    if sheet_size == 0 {
        return Err("sheet_size must be > 0".to_string());
    }

    let mut input_files: Vec<PathBuf> = fs::read_dir(input_dir)
        .map_err(|e| format!("Failed to read input dir '{}': {e}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    input_files.sort();

    if input_files.is_empty() {
        return Err(format!(
            "No .png files found in input directory '{}'",
            input_dir.display()
        ));
    }

    let mut images = Vec::with_capacity(input_files.len());
    for source_path in &input_files {
        let image = image::open(source_path)
            .map_err(|e| format!("Failed to open '{}': {e}", source_path.display()))?
            .to_rgba8();
        let name = source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sprite")
            .to_string();
        images.push((name, image));
    }

    let (sheet, entries) = pack_images(&images, sheet_size)?;
    let manifest_path = output_png.with_extension("spritesheet");

    if let Some(parent) = output_png.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create output dir '{}': {e}", parent.display()))?;
    }

    let png_tmp = temporary_output_path(output_png);
    sheet
        .save_with_format(&png_tmp, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to write '{}': {e}", png_tmp.display()))?;
    let manifest_tmp = temporary_output_path(&manifest_path);
    fs::write(&manifest_tmp, manifest_text(&entries))
        .map_err(|e| format!("Failed to write '{}': {e}", manifest_tmp.display()))?;

    promote_outputs_transactional(&[(&png_tmp, output_png), (&manifest_tmp, &manifest_path)])?;

    println!(
        "Packed {} sprites -> {} and {}",
        entries.len(),
        output_png.display(),
        manifest_path.display()
    );
    Ok(())
}

/// Shelf packing in input order: fill a row left to right, start a new row
/// below the tallest sprite when the next one does not fit.
fn pack_images(
    images: &[(String, RgbaImage)],
    sheet_size: u32,
) -> Result<(RgbaImage, Vec<SheetEntry>), String> {
    let mut sheet = RgbaImage::new(sheet_size, sheet_size);
    let mut entries = Vec::with_capacity(images.len());
    let mut x = 0u32;
    let mut y = 0u32;
    let mut row_height = 0u32;

    for (name, image) in images {
        let (w, h) = image.dimensions();
        if w + PADDING * 2 > sheet_size || h + PADDING * 2 > sheet_size {
            return Err(format!(
                "Sprite '{name}' ({w}x{h}) does not fit in sheet {sheet_size}x{sheet_size}"
            ));
        }

        if x + w + PADDING > sheet_size {
            x = 0;
            y += row_height;
            row_height = 0;
        }
        if y + h + PADDING > sheet_size {
            return Err(format!(
                "Sheet overflow while packing '{name}'. Increase sheet_size."
            ));
        }

        image::imageops::replace(&mut sheet, image, x as i64, y as i64);
        entries.push(SheetEntry {
            name: name.clone(),
            x,
            y,
            width: w,
            height: h,
        });

        x += w + PADDING;
        row_height = row_height.max(h + PADDING);
    }
    Ok((sheet, entries))
}

fn manifest_text(entries: &[SheetEntry]) -> String {
    let mut text = String::from(MANIFEST_HEADER);
    text.push('\n');
    for entry in entries {
        text.push_str(&format!(
            "{},{},{},{},{}\n",
            entry.name, entry.x, entry.y, entry.width, entry.height
        ));
    }
    text
}

fn xml2csv_command(input: &Path, output: &Path) -> Result<(), String> {
    let xml = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {e}", input.display()))?;
    let (csv, rejected) = convert_xml(&xml);
    for (line, err) in &rejected {
        eprintln!("error processing line: \"{line}\" | {err}");
    }

    let tmp = temporary_output_path(output);
    fs::write(&tmp, csv).map_err(|e| format!("Failed to write '{}': {e}", tmp.display()))?;
    promote_temporary_file(&tmp, output)?;
    println!("Converted {} -> {}", input.display(), output.display());
    Ok(())
}

/// Value of `attr="..."` on a line. The attribute name must start the line
/// or follow whitespace, and the value must not contain a comma.
fn find_attr<'a>(line: &'a str, attr: &str) -> Result<&'a str, String> {
    let pattern = format!("{attr}=\"");
    let mut search = 0;
    while let Some(found) = line[search..].find(&pattern) {
        let start = search + found;
        let at_boundary = line[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if at_boundary {
            let value_start = start + pattern.len();
            let value_len = line[value_start..]
                .find('"')
                .ok_or_else(|| format!("missing or invalid attribute '{attr}'"))?;
            let value = &line[value_start..value_start + value_len];
            if value.contains(',') {
                return Err("attribute must not contain comma character".to_string());
            }
            return Ok(value);
        }
        search = start + pattern.len();
    }
    Err(format!("missing or invalid attribute '{attr}'"))
}

/// Convert Shoebox-style XML lines into manifest rows. Lines without the five
/// attributes are returned alongside the reason they were rejected.
fn convert_xml(xml: &str) -> (String, Vec<(String, String)>) {
    let mut csv = String::from(MANIFEST_HEADER);
    csv.push('\n');
    let mut rejected = Vec::new();
    for line in xml.lines().map(str::trim) {
        let attrs: Result<Vec<&str>, String> = ["name", "x", "y", "width", "height"]
            .iter()
            .map(|attr| find_attr(line, attr))
            .collect();
        match attrs {
            Ok(values) => {
                csv.push_str(&values.join(","));
                csv.push('\n');
            }
            Err(err) => rejected.push((line.to_string(), err)),
        }
    }
    (csv, rejected)
}

fn temporary_output_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    path.with_file_name(format!("{file_name}.tmp"))
}

fn promote_temporary_file(temp_path: &Path, final_path: &Path) -> Result<(), String> {
    if final_path.exists() {
        fs::remove_file(final_path).map_err(|e| {
            format!(
                "Failed to replace existing output '{}': {e}",
                final_path.display()
            )
        })?;
    }
    fs::rename(temp_path, final_path).map_err(|e| {
        format!(
            "Failed to move temporary output '{}' -> '{}': {e}",
            temp_path.display(),
            final_path.display()
        )
    })
}

/// Promote every temporary output or none: on failure, outputs already moved
/// are removed and the previous files restored.
fn promote_outputs_transactional(pairs: &[(&Path, &Path)]) -> Result<(), String> {
    let mut backups: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut promoted: Vec<PathBuf> = Vec::new();

    for (_, final_path) in pairs {
        if final_path.exists() {
            let backup_path = final_path.with_extension("bak.tmp");
            fs::rename(final_path, &backup_path).map_err(|e| {
                format!(
                    "Failed to stage backup '{}' -> '{}': {e}",
                    final_path.display(),
                    backup_path.display()
                )
            })?;
            backups.insert((*final_path).to_path_buf(), backup_path);
        }
    }

    for (temp_path, final_path) in pairs {
        match promote_temporary_file(temp_path, final_path) {
            Ok(()) => promoted.push((*final_path).to_path_buf()),
            Err(err) => {
                for promoted_path in promoted.iter().rev() {
                    let _ = fs::remove_file(promoted_path);
                    if let Some(backup_path) = backups.get(promoted_path) {
                        let _ = fs::rename(backup_path, promoted_path);
                    }
                }
                for (final_path, backup_path) in backups {
                    if !final_path.exists() {
                        let _ = fs::rename(backup_path, final_path);
                    }
                }
                return Err(err);
            }
        }
    }

    for (_, backup_path) in backups {
        let _ = fs::remove_file(backup_path);
    }

    Ok(())
}
