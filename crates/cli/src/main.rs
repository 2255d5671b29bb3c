use anyhow::Context;
use api_shared::{ModelInfoRes, PatientPredictionRes};
use clap::{Parser, Subcommand};
use heart_risk_core::{
    attach_record_ids, read_records, write_predictions, CoreConfig, ModelPredictor, PatientRecord,
    SAMPLE_CSV,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "heart-risk")]
#[command(about = "Heart-attack risk prediction CLI")]
struct Cli {
    /// Directory holding model_v2.json, threshold_v2.json and fill_values.json
    #[arg(long, global = true, env = "HEART_RISK_MODELS_DIR")]
    models_dir: Option<String>,
    /// Model artifact path
    #[arg(long, global = true, env = "HEART_RISK_MODEL_PATH")]
    model: Option<String>,
    /// Threshold file path
    #[arg(long, global = true, env = "HEART_RISK_THRESHOLD_PATH")]
    threshold: Option<String>,
    /// Fill values file path
    #[arg(long, global = true, env = "HEART_RISK_FILL_VALUES_PATH")]
    fill_values: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every row of a CSV file
    Predict {
        /// Input CSV
        input: PathBuf,
        /// Write predictions here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Score a single JSON patient record
    Patient {
        /// JSON file with one patient record
        record: PathBuf,
    },
    /// Print model metadata
    Info,
    /// Print the sample input CSV
    Sample,
}

impl Cli {
    fn core_config(&self) -> anyhow::Result<CoreConfig> {
        Ok(CoreConfig::from_overrides(
            self.models_dir.clone(),
            self.model.clone(),
            self.threshold.clone(),
            self.fill_values.clone(),
        )?)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Predict { input, output }) => {
            let predictor = load_predictor(cli.core_config()?)?;
            match output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let count = predict_csv(&predictor, input, BufWriter::new(file))?;
                    eprintln!("Wrote {} predictions to {}", count, path.display());
                }
                None => {
                    predict_csv(&predictor, input, io::stdout().lock())?;
                }
            }
        }
        Some(Commands::Patient { record }) => {
            let predictor = load_predictor(cli.core_config()?)?;
            let res = predict_patient(&predictor, record)?;
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        Some(Commands::Info) => {
            let predictor = load_predictor(cli.core_config()?)?;
            let info = predictor
                .info()
                .context("model reported loaded but has no metadata")?;
            println!("{}", serde_json::to_string_pretty(&ModelInfoRes::from(info))?);
        }
        Some(Commands::Sample) => {
            print!("{SAMPLE_CSV}");
        }
        None => {
            println!("Use 'heart-risk --help' for commands");
        }
    }

    Ok(())
}

fn load_predictor(cfg: CoreConfig) -> anyhow::Result<ModelPredictor> {
    let predictor = ModelPredictor::new(cfg);
    predictor.load()?;
    Ok(predictor)
}

/// Score `input` and write the prediction CSV to `out`. Returns the row count.
fn predict_csv<W: Write>(predictor: &ModelPredictor, input: &Path, out: W) -> anyhow::Result<usize> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let rows = read_records(BufReader::new(file))?;
    let records: Vec<PatientRecord> = rows.iter().map(|r| r.record.clone()).collect();

    let mut predictions = predictor.predict_batch(&records)?;
    attach_record_ids(&rows, &mut predictions);
    write_predictions(out, &predictions)?;
    Ok(predictions.len())
}

fn predict_patient(predictor: &ModelPredictor, path: &Path) -> anyhow::Result<PatientPredictionRes> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let body: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let record = PatientRecord::from_json_value(&body)?;
    let result = predictor.predict_single(&record)?;
    Ok(PatientPredictionRes::from(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heart_risk_core::FEATURE_NAMES;
    use serde_json::json;
    use tempfile::TempDir;

    /// One tree splitting on Age at 0.5: 0.2 below, 0.8 above.
    fn write_models(dir: &Path) -> CoreConfig {
        let model = json!({
            "model_type": "RandomForestClassifier",
            "version": "cli-test",
            "feature_names": FEATURE_NAMES.to_vec(),
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[1.0, 1.0], [8.0, 2.0], [2.0, 8.0]]
            }]
        });
        std::fs::write(dir.join("model_v2.json"), model.to_string()).unwrap();
        std::fs::write(dir.join("threshold_v2.json"), "0.4").unwrap();
        CoreConfig::from_models_dir(dir)
    }

    #[test]
    fn test_predict_csv_writes_one_line_per_row() {
        let dir = TempDir::new().unwrap();
        let predictor = load_predictor(write_models(dir.path())).unwrap();
        let input = dir.path().join("patients.csv");
        std::fs::write(&input, SAMPLE_CSV).unwrap();

        let mut out = Vec::new();
        let count = predict_csv(&predictor, &input, &mut out).unwrap();
        assert_eq!(count, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,record_id,prediction,probability");
        // Sample ages are 0.494, 0.225 and 0.629.
        assert_eq!(lines[1], "0,7746,0,0.2");
        assert_eq!(lines[2], "1,4202,0,0.2");
        assert_eq!(lines[3], "2,6632,1,0.8");
    }

    #[test]
    fn test_predict_patient_reads_json_file() {
        let dir = TempDir::new().unwrap();
        let predictor = load_predictor(write_models(dir.path())).unwrap();

        let mut record = serde_json::Map::new();
        for name in [
            "Age", "Cholesterol", "Heart rate", "Exercise Hours Per Week",
            "Sedentary Hours Per Day", "Income", "BMI", "Triglycerides", "Sleep Hours Per Day",
            "Blood sugar", "CK-MB", "Troponin", "Systolic blood pressure",
            "Diastolic blood pressure",
        ] {
            record.insert(name.into(), json!(0.5));
        }
        for name in [
            "Diabetes", "Family History", "Smoking", "Obesity", "Alcohol Consumption",
            "Previous Heart Problems", "Medication Use",
        ] {
            record.insert(name.into(), json!(1));
        }
        record.insert("Age".into(), json!(0.7));
        record.insert("Diet".into(), json!(1));
        record.insert("Stress Level".into(), json!(5));
        record.insert("Physical Activity Days Per Week".into(), json!(3));
        record.insert("Gender".into(), json!("Female"));
        let path = dir.path().join("patient.json");
        std::fs::write(&path, serde_json::Value::Object(record).to_string()).unwrap();

        let res = predict_patient(&predictor, &path).unwrap();
        assert_eq!(res.prediction, 1);
        assert_eq!(res.probability, 0.8);
        assert_eq!(res.risk_level, "HIGH");
        assert_eq!(res.threshold_used, 0.4);
    }

    #[test]
    fn test_missing_model_fails_to_load() {
        let dir = TempDir::new().unwrap();
        assert!(load_predictor(CoreConfig::from_models_dir(dir.path())).is_err());
    }
}
