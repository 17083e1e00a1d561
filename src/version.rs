use crate::error::PDFError;
use std::fmt::Display;

macro_rules! pdf_version {
    ($(($name:ident,$version:literal)),+$(,)?) => {
        /// A PDF version as it appears in the `%PDF-M.N` header or the
        /// catalog Version entry. Ordered so the later of the two can be
        /// picked.
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
        pub enum PDFVersion {
        $(
            $name,
        )+
        }

        impl TryFrom<&str> for PDFVersion {
            type Error = PDFError;
            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $version => Ok(PDFVersion::$name),
                    )+
                    _ => Err(PDFError::InvalidVersion(value.to_string())),
                }
            }
        }

        impl std::str::FromStr for PDFVersion {
            type Err = PDFError;
            fn from_str(value: &str) -> Result<Self, Self::Err> {
                PDFVersion::try_from(value)
            }
        }

        impl Display for PDFVersion {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        PDFVersion::$name => write!(f, "{}", $version),
                    )+
                }
            }
        }
    }
}

pdf_version!(
    (V1_0, "1.0"),
    (V1_1, "1.1"),
    (V1_2, "1.2"),
    (V1_3, "1.3"),
    (V1_4, "1.4"),
    (V1_5, "1.5"),
    (V1_6, "1.6"),
    (V1_7, "1.7"),
    (V2_0, "2.0")
);
