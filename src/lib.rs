//! xtftp: a TFTP client for moving files to and from embedded targets.

pub mod tftp;
