use std::collections::HashMap;
use std::sync::LazyLock;

use crate::{Grade, IntList};

/// Security classification of a cipher suite, from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSecurity {
    /// NULL, EXPORT, single-DES, and anonymous key exchange.
    TriviallyBroken,
    /// Practical attacks exist (RC4).
    KnownAttack,
    /// No known attack, but weaker than the modern baseline
    /// (non-ephemeral DH/ECDH, legacy national ciphers).
    Suboptimal,
    /// Modern AEAD or CBC AES/ChaCha suites.
    Optimal,
}

impl CipherSecurity {
    fn grade(self) -> Grade {
        match self {
            CipherSecurity::TriviallyBroken => Grade::F,
            CipherSecurity::KnownAttack => Grade::C,
            CipherSecurity::Suboptimal => Grade::B,
            CipherSecurity::Optimal => Grade::A,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CipherInfo {
    security: CipherSecurity,
    pfs: bool,
}

/// Read-only cipher-suite security table.
///
/// Codes absent from the table (including SCSV pseudo-ciphers such as 0x00ff
/// and 0x5600, and 3DES suites) are skipped by every derived operation.
#[derive(Debug)]
pub struct CipherCheck {
    table: HashMap<u16, CipherInfo>,
}

impl CipherCheck {
    pub fn new() -> CipherCheck {
        let mut table = HashMap::with_capacity(CIPHER_TABLE.len());
        for &(code, security, pfs) in CIPHER_TABLE {
            table.insert(code, CipherInfo { security, pfs });
        }
        CipherCheck { table }
    }

    /// Process-wide instance; the table never changes after construction.
    pub fn global() -> &'static CipherCheck {
        static GLOBAL: LazyLock<CipherCheck> = LazyLock::new(CipherCheck::new);
        &GLOBAL
    }

    /// Security classification of a single cipher, if known.
    pub fn security(&self, cipher: u16) -> Option<CipherSecurity> {
        self.table.get(&cipher).map(|info| info.security)
    }

    /// True if any listed cipher is trivially broken.
    pub fn any_trivially_broken(&self, list: &IntList) -> bool {
        list.iter().any(|cipher| {
            self.table
                .get(cipher)
                .is_some_and(|info| info.security == CipherSecurity::TriviallyBroken)
        })
    }

    /// True if any listed cipher has a known attack or worse.
    pub fn any_known_attack(&self, list: &IntList) -> bool {
        list.iter().any(|cipher| {
            self.table.get(cipher).is_some_and(|info| {
                matches!(
                    info.security,
                    CipherSecurity::KnownAttack | CipherSecurity::TriviallyBroken
                )
            })
        })
    }

    /// True if the first listed cipher that is known and not trivially
    /// broken offers perfect forward secrecy.
    pub fn is_first_pfs(&self, list: &IntList) -> bool {
        list.iter()
            .filter_map(|cipher| self.table.get(cipher))
            .find(|info| info.security != CipherSecurity::TriviallyBroken)
            .is_some_and(|info| info.pfs)
    }

    /// The worst grade across the listed, table-known ciphers. An empty
    /// list, or a list with no known cipher, has no grade.
    pub fn grade(&self, list: &IntList) -> Grade {
        list.iter()
            .filter_map(|cipher| self.table.get(cipher))
            .fold(Grade::Empty, |grade, info| {
                grade.merge(info.security.grade())
            })
    }
}

impl Default for CipherCheck {
    fn default() -> Self {
        CipherCheck::new()
    }
}

use CipherSecurity::{KnownAttack, Optimal, Suboptimal, TriviallyBroken};

/// (code, classification, pfs). Classification follows the interception
/// study scheme (https://jhalderm.com/pub/papers/interception-ndss17.pdf).
#[rustfmt::skip]
const CIPHER_TABLE: &[(u16, CipherSecurity, bool)] = &[
    // NULL encryption
    (0x0000, TriviallyBroken, false), // NULL_WITH_NULL_NULL
    (0x0001, TriviallyBroken, false), // RSA_WITH_NULL_MD5
    (0x0002, TriviallyBroken, false), // RSA_WITH_NULL_SHA
    (0x002c, TriviallyBroken, false), // PSK_WITH_NULL_SHA
    (0x002d, TriviallyBroken, false), // DHE_PSK_WITH_NULL_SHA
    (0x002e, TriviallyBroken, false), // RSA_PSK_WITH_NULL_SHA
    (0x003b, TriviallyBroken, false), // RSA_WITH_NULL_SHA256
    (0xc001, TriviallyBroken, false), // ECDH_ECDSA_WITH_NULL_SHA
    (0xc006, TriviallyBroken, false), // ECDHE_ECDSA_WITH_NULL_SHA
    (0xc00b, TriviallyBroken, false), // ECDH_RSA_WITH_NULL_SHA
    (0xc010, TriviallyBroken, false), // ECDHE_RSA_WITH_NULL_SHA
    (0xc015, TriviallyBroken, false), // ECDH_anon_WITH_NULL_SHA
    // EXPORT-strength
    (0x0003, TriviallyBroken, false), // RSA_EXPORT_WITH_RC4_40_MD5
    (0x0006, TriviallyBroken, false), // RSA_EXPORT_WITH_RC2_CBC_40_MD5
    (0x0008, TriviallyBroken, false), // RSA_EXPORT_WITH_DES40_CBC_SHA
    (0x000b, TriviallyBroken, false), // DH_DSS_EXPORT_WITH_DES40_CBC_SHA
    (0x000e, TriviallyBroken, false), // DH_RSA_EXPORT_WITH_DES40_CBC_SHA
    (0x0011, TriviallyBroken, false), // DHE_DSS_EXPORT_WITH_DES40_CBC_SHA
    (0x0014, TriviallyBroken, false), // DHE_RSA_EXPORT_WITH_DES40_CBC_SHA
    (0x0017, TriviallyBroken, false), // DH_anon_EXPORT_WITH_RC4_40_MD5
    (0x0019, TriviallyBroken, false), // DH_anon_EXPORT_WITH_DES40_CBC_SHA
    // Single DES
    (0x0009, TriviallyBroken, false), // RSA_WITH_DES_CBC_SHA
    (0x000c, TriviallyBroken, false), // DH_DSS_WITH_DES_CBC_SHA
    (0x000f, TriviallyBroken, false), // DH_RSA_WITH_DES_CBC_SHA
    (0x0012, TriviallyBroken, false), // DHE_DSS_WITH_DES_CBC_SHA
    (0x0015, TriviallyBroken, false), // DHE_RSA_WITH_DES_CBC_SHA
    (0x001a, TriviallyBroken, false), // DH_anon_WITH_DES_CBC_SHA
    // Anonymous key exchange
    (0x0018, TriviallyBroken, false), // DH_anon_WITH_RC4_128_MD5
    (0x001b, TriviallyBroken, false), // DH_anon_WITH_3DES_EDE_CBC_SHA
    (0x0034, TriviallyBroken, false), // DH_anon_WITH_AES_128_CBC_SHA
    (0x003a, TriviallyBroken, false), // DH_anon_WITH_AES_256_CBC_SHA
    (0x006c, TriviallyBroken, false), // DH_anon_WITH_AES_128_CBC_SHA256
    (0x006d, TriviallyBroken, false), // DH_anon_WITH_AES_256_CBC_SHA256
    (0xc016, TriviallyBroken, false), // ECDH_anon_WITH_RC4_128_SHA
    (0xc017, TriviallyBroken, false), // ECDH_anon_WITH_3DES_EDE_CBC_SHA
    (0xc018, TriviallyBroken, false), // ECDH_anon_WITH_AES_128_CBC_SHA
    (0xc019, TriviallyBroken, false), // ECDH_anon_WITH_AES_256_CBC_SHA
    // RC4
    (0x0004, KnownAttack, false),     // RSA_WITH_RC4_128_MD5
    (0x0005, KnownAttack, false),     // RSA_WITH_RC4_128_SHA
    (0x008a, KnownAttack, false),     // PSK_WITH_RC4_128_SHA
    (0x008e, KnownAttack, true),      // DHE_PSK_WITH_RC4_128_SHA
    (0x0092, KnownAttack, false),     // RSA_PSK_WITH_RC4_128_SHA
    (0xc002, KnownAttack, false),     // ECDH_ECDSA_WITH_RC4_128_SHA
    (0xc007, KnownAttack, true),      // ECDHE_ECDSA_WITH_RC4_128_SHA
    (0xc00c, KnownAttack, false),     // ECDH_RSA_WITH_RC4_128_SHA
    (0xc011, KnownAttack, true),      // ECDHE_RSA_WITH_RC4_128_SHA
    // Non-ephemeral DH
    (0x0030, Suboptimal, false),      // DH_DSS_WITH_AES_128_CBC_SHA
    (0x0031, Suboptimal, false),      // DH_RSA_WITH_AES_128_CBC_SHA
    (0x0036, Suboptimal, false),      // DH_DSS_WITH_AES_256_CBC_SHA
    (0x0037, Suboptimal, false),      // DH_RSA_WITH_AES_256_CBC_SHA
    (0x003e, Suboptimal, false),      // DH_DSS_WITH_AES_128_CBC_SHA256
    (0x003f, Suboptimal, false),      // DH_RSA_WITH_AES_128_CBC_SHA256
    (0x0068, Suboptimal, false),      // DH_DSS_WITH_AES_256_CBC_SHA256
    (0x0069, Suboptimal, false),      // DH_RSA_WITH_AES_256_CBC_SHA256
    // Non-ephemeral ECDH
    (0xc004, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_128_CBC_SHA
    (0xc005, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_256_CBC_SHA
    (0xc00e, Suboptimal, false),      // ECDH_RSA_WITH_AES_128_CBC_SHA
    (0xc00f, Suboptimal, false),      // ECDH_RSA_WITH_AES_256_CBC_SHA
    (0xc025, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_128_CBC_SHA256
    (0xc026, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_256_CBC_SHA384
    (0xc029, Suboptimal, false),      // ECDH_RSA_WITH_AES_128_CBC_SHA256
    (0xc02a, Suboptimal, false),      // ECDH_RSA_WITH_AES_256_CBC_SHA384
    (0xc02d, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_128_GCM_SHA256
    (0xc02e, Suboptimal, false),      // ECDH_ECDSA_WITH_AES_256_GCM_SHA384
    (0xc031, Suboptimal, false),      // ECDH_RSA_WITH_AES_128_GCM_SHA256
    (0xc032, Suboptimal, false),      // ECDH_RSA_WITH_AES_256_GCM_SHA384
    // Legacy national and niche ciphers
    (0x0007, Suboptimal, false),      // RSA_WITH_IDEA_CBC_SHA
    (0x0041, Suboptimal, false),      // RSA_WITH_CAMELLIA_128_CBC_SHA
    (0x0044, Suboptimal, true),       // DHE_DSS_WITH_CAMELLIA_128_CBC_SHA
    (0x0045, Suboptimal, true),       // DHE_RSA_WITH_CAMELLIA_128_CBC_SHA
    (0x0084, Suboptimal, false),      // RSA_WITH_CAMELLIA_256_CBC_SHA
    (0x0087, Suboptimal, true),       // DHE_DSS_WITH_CAMELLIA_256_CBC_SHA
    (0x0088, Suboptimal, true),       // DHE_RSA_WITH_CAMELLIA_256_CBC_SHA
    (0x0096, Suboptimal, false),      // RSA_WITH_SEED_CBC_SHA
    (0x0099, Suboptimal, true),       // DHE_DSS_WITH_SEED_CBC_SHA
    (0x009a, Suboptimal, true),       // DHE_RSA_WITH_SEED_CBC_SHA
    // TLS 1.3
    (0x1301, Optimal, true),          // AES_128_GCM_SHA256
    (0x1302, Optimal, true),          // AES_256_GCM_SHA384
    (0x1303, Optimal, true),          // CHACHA20_POLY1305_SHA256
    (0x1304, Optimal, true),          // AES_128_CCM_SHA256
    (0x1305, Optimal, true),          // AES_128_CCM_8_SHA256
    // ECDHE
    (0xc009, Optimal, true),          // ECDHE_ECDSA_WITH_AES_128_CBC_SHA
    (0xc00a, Optimal, true),          // ECDHE_ECDSA_WITH_AES_256_CBC_SHA
    (0xc013, Optimal, true),          // ECDHE_RSA_WITH_AES_128_CBC_SHA
    (0xc014, Optimal, true),          // ECDHE_RSA_WITH_AES_256_CBC_SHA
    (0xc023, Optimal, true),          // ECDHE_ECDSA_WITH_AES_128_CBC_SHA256
    (0xc024, Optimal, true),          // ECDHE_ECDSA_WITH_AES_256_CBC_SHA384
    (0xc027, Optimal, true),          // ECDHE_RSA_WITH_AES_128_CBC_SHA256
    (0xc028, Optimal, true),          // ECDHE_RSA_WITH_AES_256_CBC_SHA384
    (0xc02b, Optimal, true),          // ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    (0xc02c, Optimal, true),          // ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
    (0xc02f, Optimal, true),          // ECDHE_RSA_WITH_AES_128_GCM_SHA256
    (0xc030, Optimal, true),          // ECDHE_RSA_WITH_AES_256_GCM_SHA384
    (0xcca8, Optimal, true),          // ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
    (0xcca9, Optimal, true),          // ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
    (0xccaa, Optimal, true),          // DHE_RSA_WITH_CHACHA20_POLY1305_SHA256
    // DHE
    (0x0032, Optimal, true),          // DHE_DSS_WITH_AES_128_CBC_SHA
    (0x0033, Optimal, true),          // DHE_RSA_WITH_AES_128_CBC_SHA
    (0x0038, Optimal, true),          // DHE_DSS_WITH_AES_256_CBC_SHA
    (0x0039, Optimal, true),          // DHE_RSA_WITH_AES_256_CBC_SHA
    (0x0040, Optimal, true),          // DHE_DSS_WITH_AES_128_CBC_SHA256
    (0x0067, Optimal, true),          // DHE_RSA_WITH_AES_128_CBC_SHA256
    (0x006a, Optimal, true),          // DHE_DSS_WITH_AES_256_CBC_SHA256
    (0x006b, Optimal, true),          // DHE_RSA_WITH_AES_256_CBC_SHA256
    (0x009e, Optimal, true),          // DHE_RSA_WITH_AES_128_GCM_SHA256
    (0x009f, Optimal, true),          // DHE_RSA_WITH_AES_256_GCM_SHA384
    // Static RSA key exchange
    (0x002f, Optimal, false),         // RSA_WITH_AES_128_CBC_SHA
    (0x0035, Optimal, false),         // RSA_WITH_AES_256_CBC_SHA
    (0x003c, Optimal, false),         // RSA_WITH_AES_128_CBC_SHA256
    (0x003d, Optimal, false),         // RSA_WITH_AES_256_CBC_SHA256
    (0x009c, Optimal, false),         // RSA_WITH_AES_128_GCM_SHA256
    (0x009d, Optimal, false),         // RSA_WITH_AES_256_GCM_SHA384
];

#[cfg(test)]
mod tests {
    use super::*;

    fn list(s: &str) -> IntList {
        IntList::parse(s).unwrap()
    }

    #[test]
    fn any_trivially_broken() {
        let cases = [
            ("", false),
            ("ff", false),
            ("0", true),
            ("3", true),
            ("4", false),
            ("c02b", false),
            ("ff,c02b", false),
            ("c02b,4,ff", false),
            ("ff,c02b,4", false),
            ("4,c02b,3", true),
        ];
        let check = CipherCheck::new();
        for (input, expected) in cases {
            assert_eq!(
                check.any_trivially_broken(&list(input)),
                expected,
                "{input}"
            );
        }
    }

    #[test]
    fn any_known_attack() {
        let cases = [
            ("", false),
            ("ff", false),
            ("0", true),
            ("3", true),
            ("4", true),
            ("c02b", false),
            ("ff,c02b", false),
            ("c02b,4,ff", true),
            ("ff,c02b,4", true),
            ("4,c02b,3", true),
        ];
        let check = CipherCheck::new();
        for (input, expected) in cases {
            assert_eq!(check.any_known_attack(&list(input)), expected, "{input}");
        }
    }

    #[test]
    fn grade() {
        let cases = [
            ("", Grade::Empty),
            ("ff", Grade::Empty),
            ("0", Grade::F),
            ("3", Grade::F),
            ("4", Grade::C),
            ("c02b", Grade::A),
            ("ff,c02b", Grade::A),
            ("c02b,4,ff", Grade::C),
            ("ff,c02b,4", Grade::C),
            ("4,c02b,3", Grade::F),
        ];
        let check = CipherCheck::new();
        for (input, expected) in cases {
            assert_eq!(check.grade(&list(input)), expected, "{input}");
        }
    }

    #[test]
    fn is_first_pfs() {
        let cases = [
            ("", false),
            ("ff", false),
            ("0", false),
            ("3", false),
            ("4", false),
            ("c02b", true),
            ("ff,c02b", true),
            ("c02b,4,ff", true),
            ("ff,c02b,4", true),
            ("4,c02b,3", false),
            // trivially broken leaders are skipped
            ("3,c02b", true),
        ];
        let check = CipherCheck::new();
        for (input, expected) in cases {
            assert_eq!(check.is_first_pfs(&list(input)), expected, "{input}");
        }
    }

    #[test]
    fn chrome_cipher_list_grades_a() {
        let chrome =
            list("1301,1302,1303,c02b,c02f,c02c,c030,cca9,cca8,c013,c014,9c,9d,2f,35,a");
        let check = CipherCheck::global();
        assert_eq!(check.grade(&chrome), Grade::A);
        assert!(check.is_first_pfs(&chrome));
        assert!(!check.any_known_attack(&chrome));
    }
}
