use lens_score::{
    reduce_records, Aperture, ApiClient, Catalog, FormStatus, PreCheck, Region, SubmissionForm,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "lens-register", about = "Registers a lens to the lens score API")]
struct Opt {
    /// Lens score API base URL [default: $LENS_SCORE_API or http://localhost:5000/api]
    #[structopt(long)]
    api: Option<String>,
    /// Lens id of the measurement source
    #[structopt(short, long)]
    lens: String,
    /// Camera mount/device of the lens
    #[structopt(short, long, default_value = "")]
    device: String,
    /// Submit the lens once checked
    #[structopt(long)]
    submit: bool,
    /// Chart of the measurement records (.svg or .png)
    #[structopt(short, long)]
    preview: Option<PathBuf>,
    /// Preview region: center or edge
    #[structopt(short, long, default_value = "center")]
    region: String,
    /// Preview aperture: -1 (best), 0 (wide open) or a F-number
    #[structopt(short, long, default_value = "-1", allow_hyphen_values = true)]
    aperture: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let api = match opt.api {
        Some(url) => ApiClient::new(url),
        None => ApiClient::default(),
    };

    let mut form = SubmissionForm::new()
        .lens_id(&opt.lens)
        .device(opt.device.as_str());
    form.precheck(&api)?;
    let lens_id = form.id();
    match form.pre_check_result() {
        None | Some(PreCheck::NotFound) => {
            println!("Lens #{} not found: submission disabled", lens_id);
            return Ok(());
        }
        Some(PreCheck::Image { title, url }) => {
            println!("{} (#{}): MTF chart at {}", title, lens_id, url);
        }
        Some(PreCheck::Text { title, records }) => {
            println!("{} (#{}): {} records", title, lens_id, records.len());
            println!(
                "  {:>8} {:>6} {:>8} {:>8}",
                "FOCAL", "F", "CENTER", "EDGE"
            );
            for record in records {
                println!(
                    "  {:>8} {:>6} {:>8} {:>8}",
                    record.focal, record.f, record.center, record.edge
                );
            }
            if let Some(path) = &opt.preview {
                let region = Region::parse(&opt.region)?;
                let aperture: Aperture = opt.aperture.parse()?;
                let samples = reduce_records(records, region, aperture);
                let catalog: Catalog = vec![lens_score::Lens {
                    id: lens_id,
                    name: title.clone(),
                    device: opt.device.clone(),
                }]
                .into();
                let synthesis = lens_score::build_series(
                    &[lens_id],
                    &catalog,
                    &BTreeMap::from([(lens_id, samples)]),
                    &Default::default(),
                    &Default::default(),
                );
                synthesis.plot(path, Some(format!("{} (F: {})", region, aperture).as_str()))?;
                println!("Preview written to {:?}", path);
            }
        }
    }

    match form.status() {
        FormStatus::Ready if opt.submit => {
            form.submit(&api)?;
            let mut catalog = Catalog::default();
            let n = catalog.refresh(&api)?;
            println!("Lens #{} submitted, {} lenses in the catalog", lens_id, n);
        }
        FormStatus::Ready => println!("Ready: run again with --submit to register the lens"),
        FormStatus::MissingDevice => println!("Set the lens device with --device to submit"),
        status => log::warn!("cannot submit: {:?}", status),
    }
    Ok(())
}
