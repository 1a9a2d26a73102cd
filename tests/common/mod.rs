//! In-process mock of a device's parameter service.
//!
//! Each server accepts exactly one connection on an ephemeral localhost port,
//! sends the protocol version and then answers request frames until the
//! client hangs up. Every frame received is recorded for inspection.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use param_transfer::wire::{self, EntryRecord, MessageType, RequestFrame};
use param_transfer::{ClientOptions, ParameterId, ParameterTransfer, ParameterType, ParameterValue};

/// One simulated parameter.
#[derive(Debug, Clone, Copy)]
pub struct MockParam {
    pub ty: ParameterType,
    pub writable: bool,
    pub value: ParameterValue,
    pub min: ParameterValue,
    pub max: ParameterValue,
    pub increment: ParameterValue,
}

impl MockParam {
    pub fn int(value: i32, min: i32, max: i32, increment: i32) -> Self {
        Self {
            ty: ParameterType::Int,
            writable: true,
            value: ParameterValue::Int(value),
            min: ParameterValue::Int(min),
            max: ParameterValue::Int(max),
            increment: ParameterValue::Int(increment),
        }
    }

    pub fn double(value: f64, min: f64, max: f64, increment: f64) -> Self {
        Self {
            ty: ParameterType::Double,
            writable: true,
            value: ParameterValue::Double(value),
            min: ParameterValue::Double(min),
            max: ParameterValue::Double(max),
            increment: ParameterValue::Double(increment),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            ty: ParameterType::Bool,
            writable: true,
            value: ParameterValue::Bool(value),
            min: ParameterValue::Bool(false),
            max: ParameterValue::Bool(true),
            increment: ParameterValue::Bool(true),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    fn record(&self, raw_id: u32) -> EntryRecord {
        EntryRecord::new(
            raw_id,
            self.ty,
            self.writable,
            self.value,
            self.min,
            self.max,
            self.increment,
        )
    }

    fn in_bounds(&self, value: ParameterValue) -> bool {
        match self.ty {
            ParameterType::Bool => true,
            _ => {
                let v = value.as_f64();
                v >= self.min.as_f64() && v <= self.max.as_f64()
            }
        }
    }
}

/// Builder for a mock parameter service.
#[derive(Debug, Clone)]
pub struct MockDevice {
    version: u32,
    params: BTreeMap<u32, MockParam>,
    unknown_records: Vec<EntryRecord>,
    enumeration_fragments: usize,
    declared_count: Option<u32>,
    write_status: u32,
    enforce_bounds: bool,
}

impl MockDevice {
    /// An empty device speaking the current protocol version.
    pub fn new() -> Self {
        Self {
            version: wire::PROTOCOL_VERSION,
            params: BTreeMap::new(),
            unknown_records: Vec::new(),
            enumeration_fragments: 1,
            declared_count: None,
            write_status: 1,
            enforce_bounds: true,
        }
    }

    /// A device with a realistic parameter set. Trigger 1 is absent, as on
    /// firmware without a second trigger output.
    pub fn stereo_camera() -> Self {
        Self::new()
            .param(ParameterId::OperationMode, MockParam::int(2, 0, 2, 1))
            .param(
                ParameterId::NumberOfDisparities,
                MockParam::int(128, 128, 128, 1).read_only(),
            )
            .param(ParameterId::DisparityOffset, MockParam::int(0, 0, 128, 16))
            .param(ParameterId::SgmP1Edge, MockParam::int(5, 0, 255, 1))
            .param(ParameterId::ConsistencyCheckEnabled, MockParam::boolean(true))
            .param(ParameterId::AutoExposureMode, MockParam::int(0, 0, 3, 1))
            .param(
                ParameterId::AutoTargetIntensity,
                MockParam::double(0.5, 0.0, 1.0, 0.01),
            )
            .param(
                ParameterId::ManualExposureTime,
                MockParam::double(5000.0, 10.0, 20000.0, 1.0),
            )
            .param(ParameterId::ManualGain, MockParam::double(1.5, 0.0, 24.0, 0.1))
            .param(ParameterId::AutoExposureRoiEnabled, MockParam::boolean(false))
            .param(ParameterId::AutoExposureRoiX, MockParam::int(0, 0, 1024, 1))
            .param(ParameterId::AutoExposureRoiY, MockParam::int(0, 0, 768, 1))
            .param(ParameterId::AutoExposureRoiWidth, MockParam::int(1024, 1, 1024, 1))
            .param(ParameterId::AutoExposureRoiHeight, MockParam::int(768, 1, 768, 1))
            .param(
                ParameterId::TriggerFrequency,
                MockParam::double(10.0, 0.1, 100.0, 0.1),
            )
            .param(ParameterId::Trigger0Enabled, MockParam::boolean(true))
            .param(
                ParameterId::Trigger0PulseWidth,
                MockParam::double(5.0, 0.1, 10.0, 0.1),
            )
            .param(ParameterId::Reboot, MockParam::boolean(false))
    }

    pub fn param(mut self, id: ParameterId, param: MockParam) -> Self {
        self.params.insert(id.raw(), param);
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add a record with an identifier the client does not know.
    pub fn unknown_param(mut self, raw_id: u32, param: MockParam) -> Self {
        self.unknown_records.push(param.record(raw_id));
        self
    }

    /// Split each enumeration reply into this many separate writes.
    pub fn enumeration_fragments(mut self, fragments: usize) -> Self {
        self.enumeration_fragments = fragments.max(1);
        self
    }

    /// Announce `count` entries and send nothing after the count.
    pub fn declare_entries(mut self, count: u32) -> Self {
        self.declared_count = Some(count);
        self
    }

    /// Status word returned for accepted writes.
    pub fn write_status(mut self, status: u32) -> Self {
        self.write_status = status;
        self
    }

    /// Reject every write with an all-zero status.
    pub fn reject_writes(self) -> Self {
        self.write_status(0)
    }

    pub fn number_of_known_params(&self) -> usize {
        self.params.len()
    }

    /// Start serving on an ephemeral port.
    pub fn spawn(self) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let recorded = frames.clone();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            self.serve(stream, &recorded);
        });

        MockServer {
            port,
            frames,
            handle: Some(handle),
        }
    }

    fn serve(mut self, mut stream: TcpStream, recorded: &Mutex<Vec<RequestFrame>>) {
        stream.set_nodelay(true).unwrap();
        stream.write_all(&self.version.to_be_bytes()).unwrap();

        let mut buf = [0u8; wire::REQUEST_FRAME_LEN];
        while read_frame(&mut stream, &mut buf) {
            let frame = RequestFrame::decode(&buf).unwrap();
            recorded.lock().unwrap().push(frame);

            let result = match frame.message_type {
                MessageType::Enumerate => self.answer_enumeration(&mut stream),
                message_type if message_type.is_write() => {
                    let reply = self.apply_write(&frame);
                    stream.write_all(&reply)
                }
                message_type => {
                    let ty = message_type.value_type().unwrap();
                    let value = self
                        .params
                        .get(&frame.parameter_id)
                        .map(|p| p.value.coerce(ty))
                        .unwrap_or(ParameterValue::Int(0).coerce(ty));
                    stream.write_all(&wire::encode_read_reply(value))
                }
            };
            if result.is_err() {
                break;
            }
        }
    }

    fn apply_write(&mut self, frame: &RequestFrame) -> [u8; wire::REPLY_LEN] {
        let Some(value) = frame.value() else {
            return wire::encode_write_status(0);
        };
        let status = self.write_status;
        let enforce = self.enforce_bounds;
        match self.params.get_mut(&frame.parameter_id) {
            Some(param)
                if status != 0
                    && param.writable
                    && value.ty() == param.ty
                    && (!enforce || param.in_bounds(value)) =>
            {
                param.value = value;
                wire::encode_write_status(status)
            }
            _ => wire::encode_write_status(0),
        }
    }

    fn answer_enumeration(&self, stream: &mut TcpStream) -> std::io::Result<()> {
        if let Some(count) = self.declared_count {
            return stream.write_all(&count.to_be_bytes());
        }

        let mut records: Vec<EntryRecord> = self
            .params
            .iter()
            .map(|(&raw_id, param)| param.record(raw_id))
            .collect();
        // Unknown entries go in the middle so decoding must continue past them
        let middle = records.len() / 2;
        for (offset, record) in self.unknown_records.iter().enumerate() {
            records.insert(middle + offset, *record);
        }

        let reply = wire::encode_enumeration(&records);
        send_fragmented(stream, &reply, self.enumeration_fragments)
    }
}

/// Write `data` in `fragments` pieces with a short pause between them.
pub fn send_fragmented(stream: &mut TcpStream, data: &[u8], fragments: usize) -> std::io::Result<()> {
    let chunk = data.len().div_ceil(fragments.max(1)).max(1);
    for (i, piece) in data.chunks(chunk).enumerate() {
        if i > 0 {
            thread::sleep(Duration::from_millis(15));
        }
        stream.write_all(piece)?;
        stream.flush()?;
    }
    Ok(())
}

/// Read one full request frame; `false` once the client is gone.
pub fn read_frame(stream: &mut TcpStream, buf: &mut [u8; wire::REQUEST_FRAME_LEN]) -> bool {
    stream.read_exact(buf).is_ok()
}

/// A running mock server.
pub struct MockServer {
    port: u16,
    frames: Arc<Mutex<Vec<RequestFrame>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn service(&self) -> String {
        self.port.to_string()
    }

    /// Connect a client with default options.
    pub fn connect(&self) -> ParameterTransfer {
        ParameterTransfer::connect("127.0.0.1", &self.service()).unwrap()
    }

    /// Connect a client with explicit options.
    pub fn connect_with(&self, options: ClientOptions) -> ParameterTransfer {
        ParameterTransfer::connect_with("127.0.0.1", &self.service(), options).unwrap()
    }

    /// Frames received so far.
    pub fn frames(&self) -> Vec<RequestFrame> {
        self.frames.lock().unwrap().clone()
    }

    /// Number of enumeration requests received so far.
    pub fn enumerations(&self) -> usize {
        self.frames()
            .iter()
            .filter(|f| f.message_type == MessageType::Enumerate)
            .count()
    }

    /// Wait for the server to finish. The client must be dropped first.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

/// Serve one connection with a hand-written script instead of a device
/// model. Returns the port.
pub fn spawn_scripted<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(stream);
    });
    (port, handle)
}

/// Client options with a short timeout for tests that expect silence.
pub fn quick_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_millis(150),
        ..ClientOptions::default()
    }
}
