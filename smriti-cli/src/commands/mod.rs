//! One module per subcommand (SPEC_FULL.md §0/§2): `ingest`, `recall`,
//! `search`, `vasana`, `svapna`, `config`.

pub mod config_cmd;
pub mod ingest;
pub mod recall;
pub mod search;
pub mod svapna;
pub mod vasana;
