use anyhow::Context;
use indicatif::ProgressBar;
use lens_score::{
    synthesize, ApiClient, Aperture, Catalog, DisplayWindow, LensApi, LensId, Palette, Region,
    Synthesis, SynthesisParams, SynthesisRunner,
};
use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "lens-score", about = "Lens sharpness scores viewer")]
struct Opt {
    /// Lens score API base URL [default: $LENS_SCORE_API or http://localhost:5000/api]
    #[structopt(long)]
    api: Option<String>,
    /// List the lenses and exit
    #[structopt(short, long)]
    list: bool,
    /// Lens ids or names, in selection order
    #[structopt(short = "s", long = "lens")]
    lenses: Vec<String>,
    /// Measurement region: center or edge
    #[structopt(short, long, default_value = "center")]
    region: String,
    /// Aperture: -1 (best), 0 (wide open) or a F-number
    #[structopt(short, long, default_value = "-1", allow_hyphen_values = true)]
    aperture: String,
    /// Shortest focal length of the display window [mm], -1 for none
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    min: f64,
    /// Longest focal length of the display window [mm], -1 for none
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    max: f64,
    /// Chart file (.svg or .png)
    #[structopt(short, long, default_value = "lens-scores.png")]
    output: PathBuf,
    /// Export the series to a CSV file
    #[structopt(long)]
    csv: Option<PathBuf>,
    /// Color scheme: tableau10, category10, set1, set2, dark2 or paired
    #[structopt(long, default_value = "tableau10")]
    palette: String,
    /// Read lens selections from stdin, one comma separated list per line
    #[structopt(short, long)]
    interactive: bool,
    /// Print each lens score estimate at this focal length [mm]
    #[structopt(long)]
    at: Option<f64>,
}

fn estimates(synthesis: &Synthesis, focal: f64) {
    println!("SCORE @ {}mm:", focal);
    for (lens_id, label, score) in synthesis.estimates(focal) {
        match score {
            Some(score) => println!("  - {:>6} {:32}: {:>8.1}", lens_id, label, score),
            None => println!("  - {:>6} {:32}: {:>8}", lens_id, label, "n/a"),
        }
    }
}

fn selection(catalog: &Catalog, keys: &[String]) -> Vec<LensId> {
    keys.iter()
        .flat_map(|key| key.split(','))
        .filter(|key| !key.trim().is_empty())
        .filter_map(|key| {
            let lens_id = catalog.resolve(key);
            if lens_id.is_none() {
                log::warn!("unknown lens {:?}", key);
            }
            lens_id
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let api = match opt.api {
        Some(url) => ApiClient::new(url),
        None => ApiClient::default(),
    };
    let mut catalog = Catalog::default();
    if let Err(e) = catalog.refresh(&api) {
        eprintln!("Failed to load the lens list from {}: {}", api.base_url(), e);
    }
    if opt.list {
        println!("{:>6} {:32} {}", "ID", "NAME", "DEVICE");
        for lens in catalog.iter() {
            println!("{:>6} {:32} {}", lens.id, lens.name, lens.device);
        }
        return Ok(());
    }

    let region = Region::parse(&opt.region)?;
    let aperture: Aperture = opt.aperture.parse()?;
    let window = DisplayWindow::new(opt.min, opt.max);
    let palette = Palette::from_name(&opt.palette)
        .with_context(|| format!("unknown color scheme {:?}", opt.palette))?;
    let title = format!("{} (F: {})", region, aperture);

    if opt.interactive {
        let catalog = Arc::new(catalog);
        let runner = SynthesisRunner::new(Arc::new(api)).palette(palette);
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        });
        let mut latest = None;
        loop {
            match lines.recv_timeout(Duration::from_millis(100)) {
                Ok(line) => {
                    let params = SynthesisParams {
                        selection: selection(&catalog, &[line]),
                        region,
                        aperture,
                        window,
                    };
                    runner.request(Arc::clone(&catalog), params);
                }
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if let Some(synthesis) = runner.poll() {
                synthesis.summary();
                latest = Some(synthesis);
            }
        }
        if let Some(synthesis) = runner.wait() {
            synthesis.summary();
            latest = Some(synthesis);
        }
        if let Some(synthesis) = latest {
            if let Some(focal) = opt.at {
                estimates(&synthesis, focal);
            }
            synthesis.plot(&opt.output, Some(title.as_str()))?;
            println!("Chart written to {:?}", opt.output);
            if let Some(path) = &opt.csv {
                synthesis.to_csv(path)?;
            }
        }
        return Ok(());
    }

    let lens_ids = selection(&catalog, &opt.lenses);
    anyhow::ensure!(!lens_ids.is_empty(), "no lens selected");
    let pb = ProgressBar::new(lens_ids.len() as u64);
    let synthesis = synthesize(
        &lens_ids,
        &catalog,
        |lens_id| {
            let samples = api.samples(lens_id, region, aperture);
            pb.inc(1);
            samples
        },
        &window,
        &palette,
    );
    pb.finish_and_clear();

    synthesis.summary();
    if let Some(focal) = opt.at {
        estimates(&synthesis, focal);
    }
    synthesis.plot(&opt.output, Some(title.as_str()))?;
    println!("Chart written to {:?}", opt.output);
    if let Some(path) = &opt.csv {
        synthesis.to_csv(path)?;
        println!("Series written to {:?}", path);
    }
    Ok(())
}
