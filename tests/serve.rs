#![cfg(feature = "tokio-serve")]

use multitherm_lib::{
    bank::{Channel, ChannelBank, DigitalOutput, RelayBank},
    engine::{Engine, Settings},
    mode::{Cadence, Mode, StreamFormat},
    protocol::RelayState,
    tokio_common,
    tokio_serve::{self, SharedEngine},
};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);
const ALL_READINGS: &str = "20.25,-999.00,2.4900";

type HostLines = Lines<BufReader<ReadHalf<DuplexStream>>>;

struct Host {
    writer: WriteHalf<DuplexStream>,
    lines: HostLines,
    task: JoinHandle<tokio_common::Result<()>>,
}

fn engine() -> SharedEngine {
    let temperatures = vec![
        Channel::new(|| Some(20.0), 0.25),
        Channel::new(|| None::<f64>, 0.0),
    ];
    let voltages = vec![Channel::new(|| Some(2.5), -0.01)];
    let relays = (0..4)
        .map(|_| Box::new(|_: RelayState| {}) as Box<dyn DigitalOutput>)
        .collect();
    SharedEngine::new(Engine::new(
        ChannelBank::new(temperatures, voltages),
        RelayBank::new(relays),
        Settings {
            cadence: Cadence {
                streaming: Duration::from_millis(20),
                diagnostic: Duration::from_millis(20),
                calibration: Duration::from_millis(20),
            },
            ..Settings::default()
        },
    ))
}

/// Starts serving `engine` on one end of an in-memory pipe.
fn connect(engine: &SharedEngine) -> Host {
    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let engine = engine.clone();
    let task =
        tokio::spawn(async move { tokio_serve::serve(&engine, server_read, server_write).await });

    let (client_read, writer) = tokio::io::split(client);
    Host {
        writer,
        lines: BufReader::new(client_read).lines(),
        task,
    }
}

impl Host {
    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    async fn next_line(&mut self) -> String {
        tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed")
    }

    /// Reads until `expected`, returning the lines skipped on the way.
    async fn skip_until(&mut self, expected: &str) -> Vec<String> {
        let mut skipped = Vec::new();
        loop {
            let line = self.next_line().await;
            if line == expected {
                return skipped;
            }
            skipped.push(line);
        }
    }

    /// Returns to instrument mode, closes the pipe and waits for `serve` to end.
    async fn finish(mut self) {
        self.send("MODE:INST\n").await;
        self.skip_until("OK").await;
        let Host {
            writer,
            lines,
            task,
        } = self;
        drop(writer);
        drop(lines);
        tokio::time::timeout(WAIT, task)
            .await
            .expect("serve did not stop")
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn query_stream_and_return_to_instrument() {
    let engine = engine();
    let mut host = connect(&engine);

    host.send("MEAS:ALL?\r\nRELAY:SET R4,ON\r\nRELAY:GET? ALL\r\n")
        .await;
    assert_eq!(host.next_line().await, ALL_READINGS);
    assert_eq!(host.next_line().await, "OK");
    assert_eq!(host.next_line().await, "0,0,0,1");

    host.send("MODE:STREAM\n").await;
    assert_eq!(host.next_line().await, "OK");
    for _ in 0..3 {
        assert_eq!(host.next_line().await, ALL_READINGS);
    }

    host.send("MODE:INST\n").await;
    // Reports already in flight may arrive before the acknowledgement.
    for line in host.skip_until("OK").await {
        assert_eq!(line, ALL_READINGS);
    }
    host.send("MODE?\n").await;
    assert_eq!(host.next_line().await, "INSTRUMENT");

    host.finish().await;
    assert_eq!(engine.mode().await, Mode::Instrument);
}

#[tokio::test]
async fn json_stream_keeps_fixed_decimals() {
    let engine = engine();
    let mut host = connect(&engine);

    host.send("mode:stream json\n").await;
    assert_eq!(host.next_line().await, "OK");
    assert_eq!(
        host.next_line().await,
        r#"{"sensor1":{"celsius":20.25,"fahrenheit":68.45},"sensor2":{"celsius":-999.00,"fahrenheit":-999.00},"voltage1":{"volts":2.4900}}"#
    );
    assert_eq!(
        engine.call(|engine| engine.stream_format()).await.unwrap(),
        StreamFormat::Json
    );

    host.finish().await;
}

#[tokio::test]
async fn calibration_report_arrives_as_one_block() {
    let engine = engine();
    let mut host = connect(&engine);

    host.send("MODE:CAL\n").await;
    assert_eq!(host.next_line().await, "OK");
    assert_eq!(host.next_line().await, "=== CALIBRATION READINGS (RAW) ===");
    assert_eq!(host.next_line().await, "Sensor 1 RAW: 20.00°C");
    assert_eq!(host.next_line().await, "Sensor 2 RAW: ERROR");
    assert_eq!(host.next_line().await, "Average: 20.00°C");

    host.finish().await;
}

#[tokio::test]
async fn relays_survive_reconnect() {
    let engine = engine();

    let mut host = connect(&engine);
    host.send("RELAY:SET ALL,ON\n").await;
    assert_eq!(host.next_line().await, "OK");
    host.finish().await;

    let mut host = connect(&engine);
    host.send("RELAY:GET? ALL\n").await;
    assert_eq!(host.next_line().await, "1,1,1,1");
    host.finish().await;
}
