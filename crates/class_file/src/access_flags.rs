use bitflags::bitflags;

bitflags! {
    /// Access and property flags shared by classes, fields, methods and inner
    /// class entries. Several bits mean different things depending on where
    /// they appear, hence the aliases.
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
        const MANDATED = 0x8000;
    }
}

impl AccessFlags {
    fn visibility_conflict(self) -> bool {
        (self & (Self::PUBLIC | Self::PRIVATE | Self::PROTECTED))
            .bits()
            .count_ones()
            > 1
    }

    // https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.1-200-E.1
    pub fn is_valid_for_class(self) -> bool {
        if self.contains(Self::INTERFACE) {
            return self.contains(Self::ABSTRACT)
                && !self.intersects(Self::FINAL | Self::SUPER | Self::ENUM | Self::MODULE);
        }

        !self.contains(Self::ANNOTATION) && !self.contains(Self::FINAL | Self::ABSTRACT)
    }

    pub fn is_valid_for_field(self) -> bool {
        !self.visibility_conflict() && !self.contains(Self::FINAL | Self::VOLATILE)
    }

    pub fn is_valid_for_method(self) -> bool {
        if self.visibility_conflict() {
            return false;
        }

        !(self.contains(Self::ABSTRACT)
            && self.intersects(
                Self::PRIVATE | Self::STATIC | Self::FINAL | Self::SYNCHRONIZED | Self::NATIVE,
            ))
    }
}
