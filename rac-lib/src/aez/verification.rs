use serde::Serialize;

use crate::bytes::Fields;
use crate::innosat::Verification;
use crate::record::Column;
use crate::Result;

/// Telecommand acceptance or execution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TcVerification {
    pub kind: Verification,
    /// Copy of the telecommand packet id
    pub tcpid: u16,
    /// Copy of the telecommand packet sequence control
    pub psc: u16,
    /// Only present in failure reports
    pub error_code: Option<u8>,
}

impl TcVerification {
    pub(crate) fn read(kind: Verification, fields: &mut Fields) -> Result<Self> {
        let tcpid = fields.u16_le()?;
        let psc = fields.u16_le()?;
        let error_code = match kind {
            Verification::AcceptFailure | Verification::ExecFailure => Some(fields.u8()?),
            Verification::AcceptSuccess | Verification::ExecSuccess => None,
        };
        Ok(TcVerification {
            kind,
            tcpid,
            psc,
            error_code,
        })
    }

    pub const COLUMNS: &'static [Column<TcVerification>] = &[
        Column {
            name: "TCV",
            value: |t| format!("{:?}", t.kind),
        },
        Column {
            name: "TCPID",
            value: |t| t.tcpid.to_string(),
        },
        Column {
            name: "PSC",
            value: |t| t.psc.to_string(),
        },
        Column {
            name: "ErrorCode",
            value: |t| t.error_code.map(|c| c.to_string()).unwrap_or_default(),
        },
    ];
}
