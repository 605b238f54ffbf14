//! Typed payloads carried inside data frames, one message per record
//! family. Field scaling is applied by the codec before these are built;
//! every scaled value is already an integer here.

/// Orderflow snapshot payload (`proto.orderflow`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Orderflow {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, tag = "2")]
    pub ticker: ::prost::alloc::string::String,
    /// Spot and the eight major-gamma levels, ×100.
    #[prost(uint32, tag = "3")]
    pub spot: u32,
    #[prost(uint32, tag = "4")]
    pub zero_major_long_gamma: u32,
    #[prost(uint32, tag = "5")]
    pub zero_major_short_gamma: u32,
    #[prost(uint32, tag = "6")]
    pub one_major_long_gamma: u32,
    #[prost(uint32, tag = "7")]
    pub one_major_short_gamma: u32,
    #[prost(uint32, tag = "8")]
    pub zero_major_call_gamma: u32,
    #[prost(uint32, tag = "9")]
    pub zero_major_put_gamma: u32,
    #[prost(uint32, tag = "10")]
    pub one_major_call_gamma: u32,
    #[prost(uint32, tag = "11")]
    pub one_major_put_gamma: u32,
    /// State metrics, truncated to whole units.
    #[prost(sint32, tag = "12")]
    pub zero_convexity_ratio: i32,
    #[prost(sint32, tag = "13")]
    pub one_convexity_ratio: i32,
    #[prost(sint32, tag = "14")]
    pub zero_gex_ratio: i32,
    #[prost(sint32, tag = "15")]
    pub one_gex_ratio: i32,
    #[prost(sint32, tag = "16")]
    pub zero_net_vanna: i32,
    #[prost(sint32, tag = "17")]
    pub one_net_vanna: i32,
    #[prost(sint32, tag = "18")]
    pub zero_net_charm: i32,
    #[prost(sint32, tag = "19")]
    pub one_net_charm: i32,
    #[prost(sint32, tag = "20")]
    pub zero_agg_total_dex: i32,
    #[prost(sint32, tag = "21")]
    pub one_agg_total_dex: i32,
    #[prost(sint32, tag = "22")]
    pub zero_agg_call_dex: i32,
    #[prost(sint32, tag = "23")]
    pub one_agg_call_dex: i32,
    #[prost(sint32, tag = "24")]
    pub zero_agg_put_dex: i32,
    #[prost(sint32, tag = "25")]
    pub one_agg_put_dex: i32,
    #[prost(sint32, tag = "26")]
    pub zero_net_total_dex: i32,
    #[prost(sint32, tag = "27")]
    pub one_net_total_dex: i32,
    #[prost(sint32, tag = "28")]
    pub zero_net_call_dex: i32,
    #[prost(sint32, tag = "29")]
    pub one_net_call_dex: i32,
    #[prost(sint32, tag = "30")]
    pub zero_net_put_dex: i32,
    #[prost(sint32, tag = "31")]
    pub one_net_put_dex: i32,
    /// Flow metrics, truncated to whole units.
    #[prost(sint32, tag = "32")]
    pub dex_orderflow: i32,
    #[prost(sint32, tag = "33")]
    pub gex_orderflow: i32,
    #[prost(sint32, tag = "34")]
    pub convexity_orderflow: i32,
    #[prost(sint32, tag = "35")]
    pub one_dex_orderflow: i32,
    #[prost(sint32, tag = "36")]
    pub one_gex_orderflow: i32,
    #[prost(sint32, tag = "37")]
    pub one_convexity_orderflow: i32,
}

/// Chain-profile payload (`proto.gex`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Gex {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, tag = "2")]
    pub ticker: ::prost::alloc::string::String,
    #[prost(int32, optional, tag = "3")]
    pub min_dte: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub sec_min_dte: ::core::option::Option<i32>,
    /// ×100 fields.
    #[prost(uint32, tag = "5")]
    pub spot: u32,
    #[prost(uint32, tag = "6")]
    pub zero_gamma: u32,
    #[prost(uint32, tag = "7")]
    pub major_pos_vol: u32,
    #[prost(uint32, tag = "8")]
    pub major_pos_oi: u32,
    #[prost(uint32, tag = "9")]
    pub major_neg_vol: u32,
    #[prost(uint32, tag = "10")]
    pub major_neg_oi: u32,
    #[prost(message, repeated, tag = "11")]
    pub strikes: ::prost::alloc::vec::Vec<Strike>,
    /// ×1000 fields.
    #[prost(sint32, tag = "12")]
    pub sum_gex_vol: i32,
    #[prost(sint32, tag = "13")]
    pub sum_gex_oi: i32,
    #[prost(sint32, tag = "14")]
    pub delta_risk_reversal: i32,
    #[prost(message, optional, tag = "15")]
    pub max_priors: ::core::option::Option<MaxPriors>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Strike {
    #[prost(uint32, tag = "1")]
    pub strike_price: u32,
    #[prost(sint32, tag = "2")]
    pub value_1: i32,
    #[prost(sint32, tag = "3")]
    pub value_2: i32,
    #[prost(message, optional, tag = "4")]
    pub priors: ::core::option::Option<Priors>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Priors {
    #[prost(sint32, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MaxPriors {
    #[prost(message, repeated, tag = "1")]
    pub tuples: ::prost::alloc::vec::Vec<MaxPriorsTuple>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MaxPriorsTuple {
    #[prost(sint32, tag = "1")]
    pub first_value: i32,
    #[prost(sint32, tag = "2")]
    pub second_value: i32,
}

/// Greek-profile payload (`proto.greek`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OptionProfile {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, tag = "2")]
    pub ticker: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub spot: u32,
    #[prost(int32, optional, tag = "4")]
    pub min_dte: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub sec_min_dte: ::core::option::Option<i32>,
    #[prost(uint32, tag = "6")]
    pub major_call_gamma: u32,
    #[prost(uint32, tag = "7")]
    pub major_put_gamma: u32,
    #[prost(uint32, tag = "8")]
    pub major_long_gamma: u32,
    #[prost(uint32, tag = "9")]
    pub major_short_gamma: u32,
    #[prost(message, repeated, tag = "10")]
    pub mini_contracts: ::prost::alloc::vec::Vec<MiniContract>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MiniContract {
    /// ×100.
    #[prost(uint32, tag = "1")]
    pub strike: u32,
    /// ×1000.
    #[prost(uint32, tag = "2")]
    pub call_ivol: u32,
    /// ×1000.
    #[prost(uint32, tag = "3")]
    pub put_ivol: u32,
    /// ×100.
    #[prost(sint32, tag = "4")]
    pub call_cvolume: i32,
    /// ×100 per element.
    #[prost(sint32, repeated, tag = "5")]
    pub call_cvolume_priors: ::prost::alloc::vec::Vec<i32>,
    /// Unscaled; absent when the source value is null.
    #[prost(sint32, optional, tag = "6")]
    pub put_cvolume: ::core::option::Option<i32>,
    /// Unscaled; absent when the source value is null.
    #[prost(message, optional, tag = "7")]
    pub put_cvolume_priors: ::core::option::Option<MiniContractPriors>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MiniContractPriors {
    #[prost(sint32, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<i32>,
}
