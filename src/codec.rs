//! Converts raw record lines into the typed wire payload: JSON parse,
//! integer scaling into the prost message, Zstandard frame compression.
//!
//! Scaling truncates toward zero (plain casts) and is never rounded;
//! overflow is not checked because upstream bounds the inputs. Text-framed
//! consumers receive the raw line and never pass through here.

use anyhow::{Context, Result};
use prost::Message;
use zstd::bulk::Compressor;

use crate::models::{GexRecord, GreekRecord, OrderflowRecord, RecordShape};
use crate::proto::feed;

pub struct Encoder {
    compressor: Compressor<'static>,
}

impl Encoder {
    pub fn new() -> Result<Self> {
        let compressor =
            Compressor::new(zstd::DEFAULT_COMPRESSION_LEVEL).context("create zstd compressor")?;
        Ok(Self { compressor })
    }

    /// Encodes a raw line according to its record shape.
    pub fn encode(&mut self, shape: RecordShape, raw: &[u8]) -> Result<Vec<u8>> {
        match shape {
            RecordShape::Orderflow => self.encode_orderflow(raw),
            RecordShape::Gex => self.encode_gex(raw),
            RecordShape::Greek => self.encode_greek(raw),
        }
    }

    pub fn encode_orderflow(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let of: OrderflowRecord =
            serde_json::from_slice(raw).context("unmarshal orderflow json")?;

        let msg = feed::Orderflow {
            timestamp: of.timestamp,
            ticker: of.ticker,
            spot: (of.spot * 100.0) as u32,
            zero_major_long_gamma: (of.z_mlgamma * 100.0) as u32,
            zero_major_short_gamma: (of.z_msgamma * 100.0) as u32,
            one_major_long_gamma: (of.o_mlgamma * 100.0) as u32,
            one_major_short_gamma: (of.o_msgamma * 100.0) as u32,
            zero_major_call_gamma: (of.zero_mcall * 100.0) as u32,
            zero_major_put_gamma: (of.zero_mput * 100.0) as u32,
            one_major_call_gamma: (of.one_mcall * 100.0) as u32,
            one_major_put_gamma: (of.one_mput * 100.0) as u32,
            zero_convexity_ratio: of.zcvr as i32,
            one_convexity_ratio: of.ocvr as i32,
            zero_gex_ratio: of.zgr as i32,
            one_gex_ratio: of.ogr as i32,
            zero_net_vanna: of.zvanna as i32,
            one_net_vanna: of.ovanna as i32,
            zero_net_charm: of.zcharm as i32,
            one_net_charm: of.ocharm as i32,
            zero_agg_total_dex: of.agg_dex as i32,
            one_agg_total_dex: of.one_agg_dex as i32,
            zero_agg_call_dex: of.agg_call_dex as i32,
            one_agg_call_dex: of.one_agg_call_dex as i32,
            zero_agg_put_dex: of.agg_put_dex as i32,
            one_agg_put_dex: of.one_agg_put_dex as i32,
            zero_net_total_dex: of.net_dex as i32,
            one_net_total_dex: of.one_net_dex as i32,
            zero_net_call_dex: of.net_call_dex as i32,
            one_net_call_dex: of.one_net_call_dex as i32,
            zero_net_put_dex: of.net_put_dex as i32,
            one_net_put_dex: of.one_net_put_dex as i32,
            dex_orderflow: of.dexoflow as i32,
            gex_orderflow: of.gexoflow as i32,
            convexity_orderflow: of.cvroflow as i32,
            one_dex_orderflow: of.one_dexoflow as i32,
            one_gex_orderflow: of.one_gexoflow as i32,
            one_convexity_orderflow: of.one_cvroflow as i32,
        };

        self.compress(&msg.encode_to_vec())
    }

    pub fn encode_gex(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let gex: GexRecord = serde_json::from_slice(raw).context("unmarshal gex json")?;

        let mut strikes = Vec::new();
        if let Some(raw_strikes) = gex.strikes.as_ref() {
            let rows: Vec<Vec<serde_json::Value>> =
                serde_json::from_str(raw_strikes.get()).context("unmarshal strikes")?;
            for row in &rows {
                // [strike_price, value_1, value_2, [priors...]?]
                if row.len() < 3 {
                    continue;
                }
                let mut strike = feed::Strike {
                    strike_price: (row[0].as_f64().unwrap_or(0.0) * 100.0) as u32,
                    value_1: (row[1].as_f64().unwrap_or(0.0) * 100.0) as i32,
                    value_2: (row[2].as_f64().unwrap_or(0.0) * 100.0) as i32,
                    priors: None,
                };
                if let Some(priors_val) = row.get(3) {
                    if let Ok(priors) =
                        serde_json::from_value::<Vec<f64>>(priors_val.clone())
                    {
                        if !priors.is_empty() {
                            strike.priors = Some(feed::Priors {
                                values: priors.iter().map(|p| (p * 100.0) as i32).collect(),
                            });
                        }
                    }
                }
                strikes.push(strike);
            }
        }

        let mut max_priors = None;
        if let Some(raw_priors) = gex.max_priors.as_ref() {
            if let Ok(rows) = serde_json::from_str::<Vec<Vec<f64>>>(raw_priors.get()) {
                let tuples: Vec<feed::MaxPriorsTuple> = rows
                    .iter()
                    .filter(|pair| pair.len() >= 2)
                    .map(|pair| feed::MaxPriorsTuple {
                        first_value: (pair[0] * 100.0) as i32,
                        second_value: (pair[1] * 1000.0) as i32,
                    })
                    .collect();
                if !tuples.is_empty() {
                    max_priors = Some(feed::MaxPriors { tuples });
                }
            }
        }

        let msg = feed::Gex {
            timestamp: gex.timestamp,
            ticker: gex.ticker,
            min_dte: Some(gex.min_dte),
            sec_min_dte: Some(gex.sec_min_dte),
            spot: (gex.spot * 100.0) as u32,
            zero_gamma: (gex.zero_gamma * 100.0) as u32,
            major_pos_vol: (gex.major_pos_vol * 100.0) as u32,
            major_pos_oi: (gex.major_pos_oi * 100.0) as u32,
            major_neg_vol: (gex.major_neg_vol * 100.0) as u32,
            major_neg_oi: (gex.major_neg_oi * 100.0) as u32,
            strikes,
            sum_gex_vol: (gex.sum_gex_vol * 1000.0) as i32,
            sum_gex_oi: (gex.sum_gex_oi * 1000.0) as i32,
            delta_risk_reversal: (gex.delta_risk_reversal * 1000.0) as i32,
            max_priors,
        };

        self.compress(&msg.encode_to_vec())
    }

    pub fn encode_greek(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let greek: GreekRecord = serde_json::from_slice(raw).context("unmarshal greek json")?;

        let mut contracts = Vec::new();
        if let Some(raw_contracts) = greek.mini_contracts.as_ref() {
            let rows: Vec<Vec<serde_json::Value>> =
                serde_json::from_str(raw_contracts.get()).context("unmarshal mini_contracts")?;
            for row in &rows {
                // [strike, call_ivol, put_ivol, call_cvolume, call_priors,
                //  put_cvolume?, put_cvolume_priors?]
                if row.len() < 5 {
                    continue;
                }
                let mut contract = feed::MiniContract {
                    strike: (row[0].as_f64().unwrap_or(0.0) * 100.0) as u32,
                    call_ivol: (row[1].as_f64().unwrap_or(0.0) * 1000.0) as u32,
                    put_ivol: (row[2].as_f64().unwrap_or(0.0) * 1000.0) as u32,
                    call_cvolume: (row[3].as_f64().unwrap_or(0.0) * 100.0) as i32,
                    call_cvolume_priors: Vec::new(),
                    put_cvolume: None,
                    put_cvolume_priors: None,
                };
                if let Ok(priors) = serde_json::from_value::<Vec<f64>>(row[4].clone()) {
                    if !priors.is_empty() {
                        contract.call_cvolume_priors =
                            priors.iter().map(|p| (p * 100.0) as i32).collect();
                    }
                }
                if let Some(put_vol) = row.get(5).and_then(|v| v.as_f64()) {
                    contract.put_cvolume = Some(put_vol as i32);
                }
                if let Some(put_priors_val) = row.get(6) {
                    if let Ok(values) =
                        serde_json::from_value::<Vec<i32>>(put_priors_val.clone())
                    {
                        if !values.is_empty() {
                            contract.put_cvolume_priors =
                                Some(feed::MiniContractPriors { values });
                        }
                    }
                }
                contracts.push(contract);
            }
        }

        let msg = feed::OptionProfile {
            timestamp: greek.timestamp,
            ticker: greek.ticker,
            spot: (greek.spot * 100.0) as u32,
            min_dte: Some(greek.min_dte),
            sec_min_dte: Some(greek.sec_min_dte),
            major_call_gamma: (greek.major_positive * 100.0) as u32,
            major_put_gamma: (greek.major_negative * 100.0) as u32,
            major_long_gamma: (greek.major_long_gamma * 100.0) as u32,
            major_short_gamma: (greek.major_short_gamma * 100.0) as u32,
            mini_contracts: contracts,
        };

        self.compress(&msg.encode_to_vec())
    }

    fn compress(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.compressor
            .compress(payload)
            .context("zstd compress payload")
    }
}
