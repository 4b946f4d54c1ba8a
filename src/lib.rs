//! Python bindings: a batch loader that training loops iterate over.
//!
//! ```python
//! import mosaic_py
//! for batch in mosaic_py.BatchLoader("mix.json", seed=0):
//!     actions = batch["actions"]  # [B][W][action_dim]
//! ```

use mosaic::assemble::{AssembleError, Batch, BatchAssembler};
use mosaic::pipeline::OpenedStream;
use mosaic::source::HostShard;
use mosaic::{Pipeline, PipelineConfig};
use pyo3::exceptions::{PyRuntimeError, PyStopIteration, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum LoaderError {
    #[error(transparent)]
    Mosaic(#[from] mosaic::Error),

    #[error("host_index and host_count must be given together")]
    PartialHostShard,
}

impl From<LoaderError> for PyErr {
    fn from(err: LoaderError) -> PyErr {
        use mosaic::Error as E;
        match &err {
            LoaderError::PartialHostShard
            | LoaderError::Mosaic(E::Config(_))
            | LoaderError::Mosaic(E::Registry(_))
            | LoaderError::Mosaic(E::Window(_))
            | LoaderError::Mosaic(E::Assemble(AssembleError::Configuration(_))) => {
                PyValueError::new_err(err.to_string())
            }
            LoaderError::Mosaic(E::Assemble(AssembleError::Halted)) => PyStopIteration::new_err(()),
            LoaderError::Mosaic(_) => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

fn load(
    mut config: PipelineConfig,
    seed: Option<u64>,
    host_index: Option<usize>,
    host_count: Option<usize>,
) -> Result<BatchAssembler<OpenedStream>, LoaderError> {
    if let Some(seed) = seed {
        config.assembler.seed = seed;
    }
    match (host_index, host_count) {
        (Some(index), Some(count)) => config.host_shard = HostShard { index, count },
        (None, None) => {}
        _ => return Err(LoaderError::PartialHostShard),
    }
    let pipeline = Pipeline::new(config)?;
    info!(datasets = ?pipeline.active_datasets(), "python batch loader opened");
    Ok(pipeline.assembler()?)
}

/// Iterator of batches as dicts of nested lists.
///
/// Keys: `sequence`, `shard_count`, `dataset_ids`, `episode_ids`, `actions`
/// `[B][W][A]`, `action_mask` `[B][W][A]`, `mask` `[B][W]` and
/// `observations`, which maps each modality to `{"shape", "data"}` with the
/// data flattened row-major over `[B, W, ...]`.
#[pyclass(unsendable)]
struct BatchLoader {
    assembler: BatchAssembler<OpenedStream>,
}

#[pymethods]
impl BatchLoader {
    #[new]
    #[pyo3(signature = (config_path, seed=None, host_index=None, host_count=None))]
    fn new(
        config_path: &str,
        seed: Option<u64>,
        host_index: Option<usize>,
        host_count: Option<usize>,
    ) -> PyResult<Self> {
        let config = PipelineConfig::from_path(config_path)
            .map_err(mosaic::Error::from)
            .map_err(LoaderError::from)?;
        let assembler = load(config, seed, host_index, host_count)?;
        Ok(Self { assembler })
    }

    /// Builds a loader from a JSON document instead of a file.
    #[staticmethod]
    #[pyo3(signature = (json, seed=None, host_index=None, host_count=None))]
    fn from_json(
        json: &str,
        seed: Option<u64>,
        host_index: Option<usize>,
        host_count: Option<usize>,
    ) -> PyResult<Self> {
        let config = PipelineConfig::from_json_str(json)
            .map_err(mosaic::Error::from)
            .map_err(LoaderError::from)?;
        let assembler = load(config, seed, host_index, host_count)?;
        Ok(Self { assembler })
    }

    #[getter]
    fn batch_size(&self) -> usize {
        self.assembler.config().batch_size
    }

    #[getter]
    fn shard_count(&self) -> usize {
        self.assembler.config().shard_count
    }

    /// Windows drawn per dataset and batches emitted so far.
    fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let stats = self.assembler.stats();
        let dict = PyDict::new(py);
        dict.set_item("drawn", stats.drawn)?;
        dict.set_item("batches", stats.batches)?;
        Ok(dict)
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    /// Raises the error that halted assembly once, then `StopIteration`.
    fn __next__<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        if self.assembler.is_halted() {
            return Err(PyStopIteration::new_err(()));
        }
        let assembler = &mut self.assembler;
        let batch = py
            .allow_threads(|| assembler.next_batch())
            .map_err(LoaderError::from)?;
        batch_to_dict(py, &batch)
    }
}

fn batch_to_dict<'py>(py: Python<'py>, batch: &Batch) -> PyResult<Bound<'py, PyDict>> {
    let windows = batch.windows();
    let dict = PyDict::new(py);
    dict.set_item("sequence", batch.sequence())?;
    dict.set_item("shard_count", batch.shard_count())?;
    dict.set_item("dataset_ids", batch.dataset_ids())?;
    dict.set_item(
        "episode_ids",
        windows.iter().map(|w| w.episode_id()).collect::<Vec<_>>(),
    )?;
    dict.set_item(
        "actions",
        windows
            .iter()
            .map(|w| w.steps().map(|s| s.action.clone()).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )?;
    dict.set_item(
        "action_mask",
        windows
            .iter()
            .map(|w| w.steps().map(|s| s.action_mask.clone()).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )?;
    dict.set_item(
        "mask",
        windows.iter().map(|w| w.mask().to_vec()).collect::<Vec<_>>(),
    )?;

    let observations = PyDict::new(py);
    if let Some(first) = windows.first() {
        for key in first.step(0).observation.keys() {
            let Some(tensor) = batch.observation(key) else {
                continue;
            };
            let entry = PyDict::new(py);
            entry.set_item("shape", tensor.shape.clone())?;
            match (tensor.as_f32(), tensor.as_u8()) {
                (Some(data), _) => entry.set_item("data", data)?,
                (_, Some(data)) => entry.set_item("data", data)?,
                _ => continue,
            }
            observations.set_item(key, entry)?;
        }
    }
    dict.set_item("observations", observations)?;
    Ok(dict)
}

/// Validates a configuration file and returns the datasets it samples.
#[pyfunction]
fn validate_config(config_path: &str) -> PyResult<Vec<String>> {
    let pipeline = Pipeline::from_path(config_path).map_err(LoaderError::from)?;
    Ok(pipeline.active_datasets())
}

#[pymodule]
fn mosaic_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<BatchLoader>()?;
    m.add_function(wrap_pyfunction!(validate_config, m)?)?;
    Ok(())
}
