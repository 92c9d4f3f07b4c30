/// Builds a `HashMap` literal, used by tests that set kernel parameters
/// (e.g. `SMA`'s `lookback`) without going through `NodeDefinition::sma`.
macro_rules! map(
    { $($key:expr => $value:expr),* $(,)? } => {
        {
            let mut m = ::std::collections::HashMap::new();
            $(
                m.insert($key, $value);
            )*
            m
        }
    };
);
