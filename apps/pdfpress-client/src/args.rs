use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfpress-client")]
#[command(
    author,
    version,
    about = "Upload a PDF to a PdfPress server and save the compressed copy"
)]
pub struct Args {
    /// PDF file to compress
    #[arg(required = true)]
    pub file: PathBuf,

    /// Base URL of the PdfPress server
    #[arg(short, long, env = "PDFPRESS_SERVER", default_value = "http://localhost:5000")]
    pub server: String,

    /// Directory to save the compressed file in (defaults to the current directory)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Do not draw the upload progress line
    #[arg(short, long)]
    pub quiet: bool,
}
