//! Time-on-air of LoRa and FSK frames (SX126x formulas).

use linktest_core::Modem;
use linktest_hal::AirtimeParams;

/// LoRa bandwidths addressed by bandwidth index.
pub const LORA_BANDWIDTHS_HZ: [u32; 3] = [125_000, 250_000, 500_000];

/// Sync word plus length byte of an FSK frame.
const FSK_HEADER_BYTES: u32 = 4;
const FSK_CRC_BYTES: u32 = 2;

pub fn lora_bandwidth_hz(index: u32) -> u32 {
    LORA_BANDWIDTHS_HZ
        .get(index as usize)
        .copied()
        .unwrap_or(LORA_BANDWIDTHS_HZ[0])
}

/// LoRa time-on-air in microseconds. `coderate` is 1..=4 for 4/5..4/8.
pub fn lora_time_on_air_us(
    sf: u32,
    bandwidth_hz: u32,
    coderate: u8,
    preamble_len: u16,
    implicit_header: bool,
    crc_on: bool,
    payload_len: u8,
) -> u32 {
    let sf = f64::from(sf.clamp(5, 12));
    let bw = f64::from(bandwidth_hz.max(1));
    let cr = f64::from(coderate.clamp(1, 4));
    let de = if sf >= 11.0 && bandwidth_hz <= 125_000 { 1.0 } else { 0.0 };
    let ih = if implicit_header { 1.0 } else { 0.0 };
    let crc = if crc_on { 1.0 } else { 0.0 };

    let t_sym = 2f64.powf(sf) / bw;
    let numerator = 8.0 * f64::from(payload_len) - 4.0 * sf + 28.0 + 16.0 * crc - 20.0 * ih;
    let n_payload = 8.0 + ((numerator / (4.0 * (sf - 2.0 * de))).ceil() * (cr + 4.0)).max(0.0);
    let t_preamble = (f64::from(preamble_len) + 4.25) * t_sym;

    ((t_preamble + n_payload * t_sym) * 1e6).round() as u32
}

/// FSK time-on-air in microseconds. `preamble_len` is in bytes.
pub fn fsk_time_on_air_us(datarate: u32, preamble_len: u16, crc_on: bool, payload_len: u8) -> u32 {
    let bytes = u32::from(preamble_len)
        + FSK_HEADER_BYTES
        + u32::from(payload_len)
        + if crc_on { FSK_CRC_BYTES } else { 0 };
    let bits = u64::from(bytes) * 8;
    (bits * 1_000_000).div_ceil(u64::from(datarate.max(1))) as u32
}

pub fn time_on_air_us(params: &AirtimeParams, payload_len: u8) -> u32 {
    match params.modem {
        Modem::Lora => lora_time_on_air_us(
            params.datarate,
            lora_bandwidth_hz(params.bandwidth),
            params.coderate,
            params.preamble_len,
            params.fixed_len,
            params.crc_on,
            payload_len,
        ),
        Modem::Fsk => {
            fsk_time_on_air_us(params.datarate, params.preamble_len, params.crc_on, payload_len)
        }
    }
}

/// Frame parameters of a flood modulation index.
///
/// Indices 0 to 7 are LoRa SF12 down to SF5 at 125 kHz, 8 and 9 are FSK at
/// 125 and 200 kbit/s, anything above is FSK at 250 kbit/s.
pub fn flood_modulation(modulation: u8) -> AirtimeParams {
    match modulation {
        0..=7 => AirtimeParams {
            modem: Modem::Lora,
            bandwidth: 0,
            datarate: 12 - u32::from(modulation),
            coderate: 1,
            preamble_len: 10,
            fixed_len: false,
            crc_on: true,
        },
        _ => AirtimeParams {
            modem: Modem::Fsk,
            bandwidth: 0,
            datarate: match modulation {
                8 => 125_000,
                9 => 200_000,
                _ => 250_000,
            },
            coderate: 0,
            preamble_len: 2,
            fixed_len: false,
            crc_on: true,
        },
    }
}
