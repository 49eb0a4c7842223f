use pdf_highlights::regions::{detect_color_regions, detect_figures, FigureDetectorConfig};
use pdf_highlights::{ImageSource, PdfError, RegionDetectorConfig};
use std::env;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_regions <image_file> [--figures]");
        std::process::exit(1);
    }
    let figures = args.get(2).map(|a| a == "--figures").unwrap_or(false);

    let image = match std::fs::read(&args[1])
        .map_err(PdfError::from)
        .and_then(|bytes| ImageSource::Bytes(bytes).decode())
    {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let regions = if figures {
        detect_figures(&image, &FigureDetectorConfig::default())
    } else {
        detect_color_regions(&image, &RegionDetectorConfig::default())
    };

    println!(
        "=== {} ({}x{}, {} regions) ===",
        args[1],
        image.width(),
        image.height(),
        regions.len()
    );
    for r in &regions {
        println!(
            "  x1={:5} y1={:5} x2={:5} y2={:5} w={:5} h={:5} {:?}",
            r.x1,
            r.y1,
            r.x2,
            r.y2,
            r.width(),
            r.height(),
            r.method
        );
    }
}
