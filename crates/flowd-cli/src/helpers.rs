//! Small translators shared by the subcommands: CLI `name=value` flags
//! into a [`MapFlagBag`], and argspec-aware coercion of each value into
//! the bag's typed setters.

use flowd_core::{ArgSchema, ArgType, MapFlagBag};

pub fn flags_to_bag(flags: &[(String, String)], schema: &ArgSchema) -> MapFlagBag {
    let mut bag = MapFlagBag::new();
    for (name, raw) in flags {
        let arg_type = schema
            .iter()
            .find(|spec| spec.name == *name)
            .map(flowd_core::ArgSpec::arg_type)
            .unwrap_or(ArgType::String);
        bag = match arg_type {
            ArgType::Boolean => bag.with_bool(name, raw == "true" || raw == "1"),
            ArgType::Integer => match raw.parse::<i64>() {
                Ok(i) => bag.with_int(name, i),
                Err(_) => bag.with_string(name, raw.clone()),
            },
            ArgType::Array => bag.with_array(name, raw.split(',').map(str::to_string).collect()),
            ArgType::Object | ArgType::String => bag.with_string(name, raw.clone()),
        };
    }
    bag
}
