//! Spin a motor open loop for ten seconds of simulated time and record every
//! control tick to `out.mcap` as CBOR.

use std::{collections::BTreeMap, fs::File, io::BufWriter, sync::Arc};

use anyhow::anyhow;
use serde::Serialize;
use svfoc::{
    pwm::PwmOutput,
    telemetry::{frame_len, Telemetry},
    Motor, MotorConfig,
};

/// Timer model that keeps the last compare values.
struct SimulatedTimer {
    auto_reload: u32,
    compare: [u32; 3],
}

impl PwmOutput for SimulatedTimer {
    fn configured_period(&self) -> u32 {
        self.auto_reload
    }

    fn start(&mut self) {
        self.compare = [0; 3];
    }

    fn set_compare(&mut self, _period: u32, compare: [u32; 3]) {
        self.compare = compare;
    }
}

#[derive(Serialize)]
struct Values {
    time_ns: u64,
    angle_electrical: f32,
    alpha: f32,
    beta: f32,
    phase_voltage: [f32; 3],
    duty: [f32; 3],
    frame_len: usize,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let mut writer = mcap::Writer::new(BufWriter::new(File::create("out.mcap")?))?;
    let channel = mcap::Channel {
        topic: String::from("openloop"),
        schema: Some(Arc::new(mcap::Schema {
            name: "".to_owned(),
            encoding: "".to_owned(),
            data: std::borrow::Cow::default(),
        })),
        message_encoding: "cbor".to_owned(),
        metadata: BTreeMap::default(),
    };
    let channel_id = writer.add_channel(&channel)?;

    let timer = SimulatedTimer {
        auto_reload: 4249,
        compare: [0; 3],
    };
    let config = MotorConfig {
        bus_voltage: 24.,
        pole_pairs: 7,
    };
    let mut motor = Motor::register(config, Some(timer)).map_err(|err| anyhow!("{err}"))?;
    motor.init(0.);

    let mut time_ns = 0;
    let dt_ns = 1_000_000;
    let mut angle_rad: f32 = 0.;
    let velocity_rad_per_sec = 20.;
    let mut frame = [0u8; frame_len(Telemetry::LEN)];

    while time_ns <= 10_000_000_000 {
        motor.run_open_loop(0., 4., angle_rad);

        let telemetry = motor.telemetry();
        let frame_bytes = telemetry
            .encode(&mut frame)
            .map_err(|err| anyhow!("{err}"))?;
        let period = motor.period() as f32;

        let mut buffer = Vec::with_capacity(128);
        ciborium::into_writer(
            &Values {
                time_ns,
                angle_electrical: telemetry.angle_electrical,
                alpha: telemetry.alpha,
                beta: telemetry.beta,
                phase_voltage: [telemetry.ua, telemetry.ub, telemetry.uc],
                duty: motor.pwm().compare.map(|ticks| 1. - ticks as f32 / period),
                frame_len: frame_bytes,
            },
            &mut buffer,
        )?;
        writer.write_to_known_channel(
            &mcap::records::MessageHeader {
                channel_id,
                sequence: 0,
                log_time: time_ns,
                publish_time: time_ns,
            },
            &buffer,
        )?;

        angle_rad += velocity_rad_per_sec * (dt_ns as f32 / 1e9);
        time_ns += dt_ns;
    }

    writer.finish()?;

    Ok(())
}
