//! Sinks for the raw trace points devices emit.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::devices::types::TracePoint;
use crate::error::EnergyError;

/// Column header of the CSV trace.
const HEADER: &str = "device,time_s,record,voltage_v,energy_j,from,to,consumed_j,notification";

/// Receives every trace point produced during a run.
pub trait TraceRecorder {
    /// Records one point emitted by `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be written.
    fn record(&mut self, device: usize, point: &TracePoint) -> Result<(), EnergyError>;

    /// Called once after the run.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    fn finish(&mut self) -> Result<(), EnergyError> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl TraceRecorder for NullRecorder {
    fn record(&mut self, _device: usize, _point: &TracePoint) -> Result<(), EnergyError> {
        Ok(())
    }
}

/// Keeps every point in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    points: Vec<(usize, TracePoint)>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(usize, TracePoint)] {
        &self.points
    }

    /// Points emitted by one device.
    pub fn for_device(&self, device: usize) -> impl Iterator<Item = &TracePoint> {
        self.points
            .iter()
            .filter(move |(d, _)| *d == device)
            .map(|(_, p)| p)
    }
}

impl TraceRecorder for MemoryRecorder {
    fn record(&mut self, device: usize, point: &TracePoint) -> Result<(), EnergyError> {
        self.points.push((device, *point));
        Ok(())
    }
}

/// Streams points as CSV rows, one per point.
///
/// Columns that do not apply to a record kind are left empty.
pub struct CsvTraceRecorder<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvTraceRecorder<BufWriter<File>> {
    /// Creates (or truncates) the file at `path` and writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn create(path: &Path) -> Result<Self, EnergyError> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: Write> CsvTraceRecorder<W> {
    /// Wraps any writer and writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn from_writer(writer: W) -> Result<Self, EnergyError> {
        let mut writer = csv::WriterBuilder::new().from_writer(writer);
        writer.write_record(HEADER.split(','))?;
        Ok(Self { writer })
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> Result<W, EnergyError> {
        self.writer
            .into_inner()
            .map_err(|e| EnergyError::Io(e.into_error()))
    }
}

impl<W: Write> TraceRecorder for CsvTraceRecorder<W> {
    fn record(&mut self, device: usize, point: &TracePoint) -> Result<(), EnergyError> {
        let device = device.to_string();
        let time = format!("{:.9}", point.time().as_secs_f64());
        let empty = String::new();
        let row: [String; 9] = match *point {
            TracePoint::Voltage {
                voltage_v,
                energy_j,
                ..
            } => [
                device,
                time,
                "voltage".into(),
                format!("{voltage_v:.6}"),
                format!("{energy_j:.9}"),
                empty.clone(),
                empty.clone(),
                empty.clone(),
                empty,
            ],
            TracePoint::State { from, to, .. } => [
                device,
                time,
                "state".into(),
                empty.clone(),
                empty.clone(),
                from.to_string(),
                to.to_string(),
                empty.clone(),
                empty,
            ],
            TracePoint::Consumption { total_j, .. } => [
                device,
                time,
                "consumption".into(),
                empty.clone(),
                empty.clone(),
                empty.clone(),
                empty,
                format!("{total_j:.9}"),
                String::new(),
            ],
            TracePoint::Notification { kind, .. } => [
                device,
                time,
                "notification".into(),
                empty.clone(),
                empty.clone(),
                empty.clone(),
                empty.clone(),
                empty,
                kind.as_str().into(),
            ],
        };
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EnergyError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::types::{EnergyNotification, PhyState};
    use crate::sim::clock::SimTime;

    fn points() -> Vec<TracePoint> {
        let t = SimTime::from_secs_f64(1.5);
        vec![
            TracePoint::Voltage {
                time: t,
                voltage_v: 3.1,
                energy_j: 0.048,
            },
            TracePoint::State {
                time: t,
                from: PhyState::Sleep,
                to: PhyState::Tx,
            },
            TracePoint::Consumption {
                time: t,
                total_j: 0.002,
            },
            TracePoint::Notification {
                time: t,
                kind: EnergyNotification::Drained,
            },
        ]
    }

    #[test]
    fn memory_recorder_keeps_order_and_device() {
        let mut rec = MemoryRecorder::new();
        for (i, p) in points().iter().enumerate() {
            rec.record(i % 2, p).ok();
        }
        assert_eq!(rec.points().len(), 4);
        assert_eq!(rec.for_device(1).count(), 2);
        assert!(matches!(rec.points()[1].1, TracePoint::State { .. }));
    }

    #[test]
    fn csv_rows_have_fixed_width() {
        let mut rec = CsvTraceRecorder::from_writer(Vec::new()).unwrap_or_else(|e| panic!("{e}"));
        for p in points() {
            rec.record(3, &p).ok();
        }
        rec.finish().ok();
        let buf = rec.into_inner().unwrap_or_default();
        let text = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], HEADER);
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 9);
            assert!(line.starts_with("3,1.500000000,"));
        }
        assert!(lines[2].contains(",SLEEP,TX,"));
        assert!(lines[4].ends_with(",drained"));
    }

    #[test]
    fn csv_file_is_truncated_on_create() {
        let path = std::env::temp_dir().join(format!("capsim-trace-{}.csv", std::process::id()));
        std::fs::write(&path, "stale\nstale\nstale\n").ok();
        let rec = CsvTraceRecorder::create(&path).map(|mut r| {
            r.finish().ok();
        });
        assert!(rec.is_ok());
        let text = std::fs::read_to_string(&path).unwrap_or_default();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![HEADER]);
        std::fs::remove_file(&path).ok();
    }
}
