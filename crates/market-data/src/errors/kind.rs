/// Failure taxonomy for a single provider fetch.
///
/// Every kind is treated the same at the provider boundary (the instrument
/// becomes unavailable for this refresh), the classification only decides how
/// loudly the failure is logged.
///
/// | Kind | Typical cause | Logged at |
/// |------|---------------|-----------|
/// | `Transport` | connection error, timeout, non-2xx | `warn` |
/// | `Payload` | "no data" sentinel, missing field, empty body | `debug` |
/// | `Decode` | bad charset, malformed JSON, unparseable number | `debug` |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The request never produced a usable response.
    Transport,

    /// The provider answered, but has nothing for this instrument.
    Payload,

    /// The provider answered with something we could not decode.
    Decode,
}
