//! Native text model format
//!
//! A model file is a header of `key value...` lines followed by `SV` and one
//! line per support vector:
//!
//! ```text
//! svm_type c_svc
//! kernel_type rbf
//! gamma 0.5
//! nr_class 2
//! total_sv 2
//! rho 0.1
//! label 1 -1
//! nr_sv 1 1
//! SV
//! 0.7 1:0.5 3:1.2
//! -0.7 2:0.3
//! ```

use crate::core::{KernelParams, KernelType, MachineType, Result, SVMError, SvmNode};
use crate::solver::model::SvmModel;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Name reported for models read from an anonymous stream
const STREAM_NAME: &str = "<stream>";

impl SvmModel {
    /// Load a model from a native model file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| SVMError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let model = parse_model(BufReader::new(file)).map_err(load_error)?;
        log::debug!(
            "Loaded {} model with {} support vectors from {}",
            model.machine_type,
            model.total_sv(),
            path.display()
        );
        Ok(model)
    }

    /// Read a model in native format from any buffered reader
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        parse_model(reader).map_err(|reason| SVMError::ModelLoad {
            path: STREAM_NAME.to_string(),
            reason,
        })
    }

    /// Save the model to a native model file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the model in native format
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let kernel = &self.kernel;
        writeln!(writer, "svm_type {}", self.machine_type)?;
        writeln!(writer, "kernel_type {}", kernel.kernel_type)?;
        if kernel.kernel_type.uses_degree() {
            writeln!(writer, "degree {}", kernel.degree)?;
        }
        if kernel.kernel_type.uses_gamma() {
            writeln!(writer, "gamma {}", kernel.gamma)?;
        }
        if kernel.kernel_type.uses_coef0() {
            writeln!(writer, "coef0 {}", kernel.coef0)?;
        }
        writeln!(writer, "nr_class {}", self.nr_class)?;
        writeln!(writer, "total_sv {}", self.total_sv())?;
        writeln!(writer, "rho {}", join(&self.rho))?;

        if let Some(labels) = &self.label {
            writeln!(writer, "label {}", join(labels))?;
        }
        if let Some(prob_a) = &self.prob_a {
            writeln!(writer, "probA {}", join(prob_a))?;
        }
        if let Some(prob_b) = &self.prob_b {
            writeln!(writer, "probB {}", join(prob_b))?;
        }
        if let Some(n_sv) = &self.n_sv {
            writeln!(writer, "nr_sv {}", join(n_sv))?;
        }

        writeln!(writer, "SV")?;
        let precomputed = kernel.kernel_type == KernelType::Precomputed;
        for (i, sv) in self.sv.iter().enumerate() {
            let coefs: Vec<f64> = self.sv_coef.iter().map(|row| row[i]).collect();
            write!(writer, "{}", join(&coefs))?;
            for node in sv.iter().take_while(|node| !node.is_sentinel()) {
                if precomputed {
                    write!(writer, " 0:{}", node.value as i64)?;
                } else {
                    write!(writer, " {}:{}", node.index, node.value)?;
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Header fields collected before the `SV` marker
#[derive(Default)]
struct Header {
    machine_type: Option<MachineType>,
    kernel_type: Option<KernelType>,
    degree: i32,
    gamma: f64,
    coef0: f64,
    nr_class: Option<usize>,
    total_sv: Option<usize>,
    rho: Option<Vec<f64>>,
    label: Option<Vec<i32>>,
    prob_a: Option<Vec<f64>>,
    prob_b: Option<Vec<f64>>,
    n_sv: Option<Vec<usize>>,
}

fn parse_model<R: BufRead>(reader: R) -> std::result::Result<SvmModel, String> {
    let mut lines = reader.lines().enumerate();
    let mut header = Header::default();
    let mut saw_sv_marker = false;

    for (line_num, line) in lines.by_ref() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default();
        let values: Vec<&str> = parts.collect();
        let at = |e: String| format!("line {}: {}", line_num + 1, e);

        match key {
            "svm_type" => {
                header.machine_type = Some(parse_single(&values, key).map_err(at)?)
            }
            "kernel_type" => {
                header.kernel_type = Some(parse_single(&values, key).map_err(at)?)
            }
            "degree" => header.degree = parse_single(&values, key).map_err(at)?,
            "gamma" => header.gamma = parse_single(&values, key).map_err(at)?,
            "coef0" => header.coef0 = parse_single(&values, key).map_err(at)?,
            "nr_class" => header.nr_class = Some(parse_single(&values, key).map_err(at)?),
            "total_sv" => header.total_sv = Some(parse_single(&values, key).map_err(at)?),
            "rho" => header.rho = Some(parse_list(&values, key).map_err(at)?),
            "label" => header.label = Some(parse_list(&values, key).map_err(at)?),
            "probA" => header.prob_a = Some(parse_list(&values, key).map_err(at)?),
            "probB" => header.prob_b = Some(parse_list(&values, key).map_err(at)?),
            "nr_sv" => header.n_sv = Some(parse_list(&values, key).map_err(at)?),
            "SV" => {
                saw_sv_marker = true;
                break;
            }
            _ => return Err(at(format!("unknown header entry `{key}'"))),
        }
    }

    if !saw_sv_marker {
        return Err("missing `SV' section".to_string());
    }

    let machine_type = header.machine_type.ok_or("missing svm_type")?;
    let kernel_type = header.kernel_type.ok_or("missing kernel_type")?;
    let nr_class = header.nr_class.ok_or("missing nr_class")?;
    let total_sv = header.total_sv.ok_or("missing total_sv")?;
    let rho = header.rho.ok_or("missing rho")?;
    if machine_type.is_classifier() {
        if nr_class == 0 {
            return Err("a classifier needs at least one class".to_string());
        }
    } else if nr_class != 2 {
        return Err(format!(
            "{machine_type} models carry nr_class 2, found {nr_class}"
        ));
    }

    let n_coef = nr_class - 1;
    let mut sv_coef = vec![Vec::with_capacity(total_sv); n_coef];
    let mut sv = Vec::with_capacity(total_sv);

    for (line_num, line) in lines {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let at = |e: String| format!("line {}: {}", line_num + 1, e);

        let mut tokens = line.split_whitespace();
        for row in sv_coef.iter_mut() {
            let token = tokens
                .next()
                .ok_or_else(|| at("support vector line is missing coefficients".to_string()))?;
            row.push(parse_token::<f64>(token, "coefficient").map_err(at)?);
        }

        let mut nodes = Vec::new();
        for token in tokens {
            nodes.push(parse_node(token).map_err(at)?);
        }
        nodes.push(SvmNode::SENTINEL);
        sv.push(nodes);
    }

    if sv.len() != total_sv {
        return Err(format!(
            "total_sv is {total_sv} but {} support vectors follow",
            sv.len()
        ));
    }

    let model = SvmModel {
        machine_type,
        kernel: KernelParams {
            kernel_type,
            degree: header.degree,
            gamma: header.gamma,
            coef0: header.coef0,
        },
        nr_class,
        sv,
        sv_coef,
        rho,
        prob_a: header.prob_a,
        prob_b: header.prob_b,
        sv_indices: None,
        label: header.label,
        n_sv: header.n_sv,
    };
    model.validate()?;
    Ok(model)
}

fn parse_token<T: std::str::FromStr>(token: &str, what: &str) -> std::result::Result<T, String> {
    token
        .parse::<T>()
        .map_err(|_| format!("invalid {what}: {token}"))
}

fn parse_single<T: std::str::FromStr>(values: &[&str], key: &str) -> std::result::Result<T, String> {
    match values {
        [value] => parse_token(value, key),
        _ => Err(format!("`{key}' takes exactly one value")),
    }
}

fn parse_list<T: std::str::FromStr>(values: &[&str], key: &str) -> std::result::Result<Vec<T>, String> {
    values.iter().map(|value| parse_token(value, key)).collect()
}

fn parse_node(token: &str) -> std::result::Result<SvmNode, String> {
    let (index, value) = token
        .split_once(':')
        .ok_or_else(|| format!("invalid feature format: {token}"))?;
    let index: i32 = parse_token(index, "feature index")?;
    if index < 0 {
        return Err(format!("feature index must not be negative: {index}"));
    }
    let value: f64 = parse_token(value, "feature value")?;
    Ok(SvmNode::new(index, value))
}
