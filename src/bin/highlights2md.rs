//! CLI tool that turns the highlighted passages of a PDF into a condensed
//! Markdown summary

use pdf_highlights::markdown::{to_markdown, to_plain_text, MarkdownOptions};
use pdf_highlights::session::{JsonFileStore, Session, SessionStore, DEFAULT_STATE_FILE};
use pdf_highlights::{
    summarize_document, DocumentSummary, ImageDirRenderer, LopdfDocument, PdfError,
    SummaryOptions,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Debug, Default)]
struct Args {
    pdf_path: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json: bool,
    text: bool,
    threshold: Option<u8>,
    pages: Option<(u32, u32)>,
    images: bool,
    page_images: Option<PathBuf>,
    persist: bool,
    resume: bool,
    clear_state: bool,
    state_file: Option<PathBuf>,
    #[cfg(feature = "pdfium")]
    pdfium_library: Option<PathBuf>,
}

fn usage(program: &str) {
    eprintln!("Usage: {} <pdf_file> [output_file] [options]", program);
    eprintln!("       {} --resume [output_file] [options]", program);
    eprintln!("       {} --clear-state", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json               Print the summary as JSON");
    eprintln!("  --text               Write plain text instead of Markdown");
    eprintln!("  --threshold N        Minimum match score 0-100 (default 50)");
    eprintln!("  --pages A-B          Only process pages A through B");
    eprintln!("  --images             Collect figure candidates and captions");
    eprintln!("  --page-images DIR    Page images named page-<n>.png for color detection");
    #[cfg(feature = "pdfium")]
    eprintln!("  --pdfium LIB         Render pages with the Pdfium library at LIB");
    eprintln!("  --persist            Keep the session file after a successful run");
    eprintln!("  --state FILE         Session file (default {})", DEFAULT_STATE_FILE);
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--text" => parsed.text = true,
            "--images" => parsed.images = true,
            "--persist" => parsed.persist = true,
            "--resume" => parsed.resume = true,
            "--clear-state" => parsed.clear_state = true,
            "--threshold" => {
                let value = iter.next().ok_or("--threshold needs a value")?;
                let threshold: u8 = value
                    .parse()
                    .map_err(|_| format!("invalid threshold: {}", value))?;
                if threshold > 100 {
                    return Err(format!("threshold must be 0-100, got {}", threshold));
                }
                parsed.threshold = Some(threshold);
            }
            "--pages" => {
                let value = iter.next().ok_or("--pages needs a range like 3-7")?;
                parsed.pages = Some(parse_page_range(value)?);
            }
            "--page-images" => {
                let value = iter.next().ok_or("--page-images needs a directory")?;
                parsed.page_images = Some(PathBuf::from(value));
            }
            "--state" => {
                let value = iter.next().ok_or("--state needs a file")?;
                parsed.state_file = Some(PathBuf::from(value));
            }
            #[cfg(feature = "pdfium")]
            "--pdfium" => {
                let value = iter.next().ok_or("--pdfium needs a library path")?;
                parsed.pdfium_library = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            positional => {
                // With --resume the PDF comes from the session, so the only
                // positional argument is the output file
                if parsed.pdf_path.is_none() && !parsed.resume {
                    parsed.pdf_path = Some(PathBuf::from(positional));
                } else if parsed.output_file.is_none() {
                    parsed.output_file = Some(PathBuf::from(positional));
                } else {
                    return Err(format!("unexpected argument: {}", positional));
                }
            }
        }
    }

    Ok(parsed)
}

fn parse_page_range(value: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("invalid page range: {}", value);
    match value.split_once('-') {
        Some((start, end)) => Ok((
            start.trim().parse().map_err(|_| invalid())?,
            end.trim().parse().map_err(|_| invalid())?,
        )),
        None => {
            let page = value.trim().parse().map_err(|_| invalid())?;
            Ok((page, page))
        }
    }
}

fn run(args: &Args, store: &dyn SessionStore) -> Result<(DocumentSummary, PathBuf), PdfError> {
    let pdf_path = match &args.pdf_path {
        Some(path) => path.clone(),
        None => store
            .load()?
            .pdf_path
            .ok_or_else(|| PdfError::Session("no PDF recorded in the session".to_string()))?,
    };
    store.save(&Session::for_pdf(&pdf_path, args.persist))?;

    let bytes = fs::read(&pdf_path)?;
    let mut doc = LopdfDocument::load_mem(&bytes)?;
    if let Some(dir) = &args.page_images {
        doc = doc.with_renderer(ImageDirRenderer::new(dir));
    }
    #[cfg(feature = "pdfium")]
    if let Some(library) = &args.pdfium_library {
        let renderer = pdf_highlights::pdfium::PdfiumRenderer::render_document(
            library,
            &bytes,
            pdf_highlights::pdfium::DEFAULT_DPI,
        )?;
        doc = doc.with_renderer(renderer);
    }

    let mut options = SummaryOptions {
        include_images: args.images,
        page_range: args.pages.map(|(start, end)| start..=end),
        ..SummaryOptions::default()
    };
    if let Some(threshold) = args.threshold {
        options.threshold = threshold;
    }

    let summary = summarize_document(&doc, options)?;

    if !args.persist {
        store.clear()?;
    }
    Ok((summary, pdf_path))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().collect();
    let program = raw.first().map(String::as_str).unwrap_or("highlights2md");

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            usage(program);
            process::exit(1);
        }
    };

    let store = JsonFileStore::new(
        args.state_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
    );

    if args.clear_state {
        if let Err(e) = store.clear() {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        println!("Session state cleared: {}", store.path().display());
        return;
    }

    if args.pdf_path.is_none() && !args.resume {
        usage(program);
        process::exit(1);
    }

    let start = Instant::now();

    match run(&args, &store) {
        Ok((summary, pdf_path)) => {
            let elapsed = start.elapsed();

            let rendered = if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                }
            } else if args.text {
                to_plain_text(&summary)
            } else {
                to_markdown(&summary, &MarkdownOptions::default())
            };

            if let Some(output) = &args.output_file {
                if let Err(e) = fs::write(output, &rendered) {
                    eprintln!("Error: cannot write {}: {}", output.display(), e);
                    process::exit(1);
                }
                eprintln!(
                    "Summary of {} written to: {} ({} pages, {}ms)",
                    pdf_path.display(),
                    output.display(),
                    summary.pages.len(),
                    elapsed.as_millis()
                );
            } else {
                println!("{}", rendered);
            }

            let degraded = summary.degraded_pages();
            if !degraded.is_empty() {
                eprintln!("Warning: pages with errors: {:?}", degraded);
            }
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    }
}
