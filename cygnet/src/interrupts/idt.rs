//! # The Interrupt Descriptor Table
//!
//! One minimal stub per vector, all funneling into the shared
//! [`dispatch`](super::dispatch) table. The `x86-interrupt` ABI is the
//! trampoline: the compiler-generated prologue saves the interrupted
//! context and the epilogue restores it, and vectors where the CPU
//! pushes an error code get the matching typed signature so every stub
//! sees a uniform frame. Each stub contributes exactly one thing by
//! hand: its own vector number.
//!
//! Hardware IRQ stubs additionally acknowledge the PIC; without the
//! end-of-interrupt that device's line stays silent forever.
//!
//! Unhandled CPU exceptions are reported over serial and halt cleanly
//! rather than silently continuing. Breakpoints report and resume.

use super::{PIC_1_OFFSET, PICS};
use lazy_static::lazy_static;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

/// Exception stub: dispatch through the table, report and halt if
/// nothing is bound.
macro_rules! exception_stub {
    ($name:ident, $vector:expr, $title:expr) => {
        extern "x86-interrupt" fn $name(stack_frame: InterruptStackFrame) {
            if !super::dispatch($vector) {
                crate::serial_println!("EXCEPTION: {} (vector {})", $title, $vector);
                crate::serial_println!("{:#?}", stack_frame);
                crate::hlt_loop();
            }
        }
    };
}

/// Exception stub for vectors where the CPU pushes an error code.
macro_rules! exception_stub_with_code {
    ($name:ident, $vector:expr, $title:expr) => {
        extern "x86-interrupt" fn $name(stack_frame: InterruptStackFrame, error_code: u64) {
            if !super::dispatch($vector) {
                crate::serial_println!(
                    "EXCEPTION: {} (vector {}, error code {:#x})",
                    $title,
                    $vector,
                    error_code
                );
                crate::serial_println!("{:#?}", stack_frame);
                crate::hlt_loop();
            }
        }
    };
}

/// Hardware IRQ stub: dispatch, then acknowledge the PIC.
macro_rules! irq_stub {
    ($name:ident, $irq:expr) => {
        extern "x86-interrupt" fn $name(_stack_frame: InterruptStackFrame) {
            let vector = PIC_1_OFFSET + $irq;
            super::dispatch(vector);
            unsafe {
                PICS.lock().notify_end_of_interrupt(vector);
            }
        }
    };
}

exception_stub!(divide_error_stub, 0, "DIVIDE ERROR");
exception_stub!(debug_stub, 1, "DEBUG");
exception_stub!(nmi_stub, 2, "NON-MASKABLE INTERRUPT");
exception_stub!(overflow_stub, 4, "OVERFLOW");
exception_stub!(bound_range_stub, 5, "BOUND RANGE EXCEEDED");
exception_stub!(invalid_opcode_stub, 6, "INVALID OPCODE");
exception_stub!(device_not_available_stub, 7, "DEVICE NOT AVAILABLE");
exception_stub!(x87_floating_point_stub, 16, "x87 FLOATING POINT");
exception_stub!(simd_floating_point_stub, 19, "SIMD FLOATING POINT");
exception_stub!(virtualization_stub, 20, "VIRTUALIZATION");

exception_stub_with_code!(invalid_tss_stub, 10, "INVALID TSS");
exception_stub_with_code!(segment_not_present_stub, 11, "SEGMENT NOT PRESENT");
exception_stub_with_code!(stack_segment_fault_stub, 12, "STACK SEGMENT FAULT");
exception_stub_with_code!(general_protection_stub, 13, "GENERAL PROTECTION FAULT");
exception_stub_with_code!(alignment_check_stub, 17, "ALIGNMENT CHECK");

irq_stub!(irq0_stub, 0);
irq_stub!(irq1_stub, 1);
irq_stub!(irq2_stub, 2);
irq_stub!(irq3_stub, 3);
irq_stub!(irq4_stub, 4);
irq_stub!(irq5_stub, 5);
irq_stub!(irq6_stub, 6);
irq_stub!(irq7_stub, 7);
irq_stub!(irq8_stub, 8);
irq_stub!(irq9_stub, 9);
irq_stub!(irq10_stub, 10);
irq_stub!(irq11_stub, 11);
irq_stub!(irq12_stub, 12);
irq_stub!(irq13_stub, 13);
irq_stub!(irq14_stub, 14);
irq_stub!(irq15_stub, 15);

/// Breakpoints are the one exception that should resume: report and
/// return to the interrupted context.
extern "x86-interrupt" fn breakpoint_stub(stack_frame: InterruptStackFrame) {
    if !super::dispatch(3) {
        crate::serial_println!("EXCEPTION: BREAKPOINT");
        crate::serial_println!("{:#?}", stack_frame);
    }
}

extern "x86-interrupt" fn page_fault_stub(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    if !super::dispatch(14) {
        crate::serial_println!("EXCEPTION: PAGE FAULT");
        crate::serial_println!(
            "Accessed address: {:?}",
            x86_64::registers::control::Cr2::read()
        );
        crate::serial_println!("Error code: {:?}", error_code);
        crate::serial_println!("{:#?}", stack_frame);
        crate::hlt_loop();
    }
}

extern "x86-interrupt" fn double_fault_stub(stack_frame: InterruptStackFrame, _error_code: u64) -> ! {
    // A fault during fault delivery: the machine cannot continue.
    crate::serial_println!("EXCEPTION: DOUBLE FAULT");
    crate::serial_println!("{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn machine_check_stub(stack_frame: InterruptStackFrame) -> ! {
    crate::serial_println!("EXCEPTION: MACHINE CHECK");
    crate::serial_println!("{:#?}", stack_frame);
    crate::hlt_loop();
}

lazy_static! {
    /// Built once on first use, loaded at boot, never torn down.
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        idt.divide_error.set_handler_fn(divide_error_stub);
        idt.debug.set_handler_fn(debug_stub);
        idt.non_maskable_interrupt.set_handler_fn(nmi_stub);
        idt.breakpoint.set_handler_fn(breakpoint_stub);
        idt.overflow.set_handler_fn(overflow_stub);
        idt.bound_range_exceeded.set_handler_fn(bound_range_stub);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_stub);
        idt.device_not_available.set_handler_fn(device_not_available_stub);
        idt.double_fault.set_handler_fn(double_fault_stub);
        idt.invalid_tss.set_handler_fn(invalid_tss_stub);
        idt.segment_not_present.set_handler_fn(segment_not_present_stub);
        idt.stack_segment_fault.set_handler_fn(stack_segment_fault_stub);
        idt.general_protection_fault.set_handler_fn(general_protection_stub);
        idt.page_fault.set_handler_fn(page_fault_stub);
        idt.x87_floating_point.set_handler_fn(x87_floating_point_stub);
        idt.alignment_check.set_handler_fn(alignment_check_stub);
        idt.machine_check.set_handler_fn(machine_check_stub);
        idt.simd_floating_point.set_handler_fn(simd_floating_point_stub);
        idt.virtualization.set_handler_fn(virtualization_stub);

        idt[(PIC_1_OFFSET + 0) as usize].set_handler_fn(irq0_stub);
        idt[(PIC_1_OFFSET + 1) as usize].set_handler_fn(irq1_stub);
        idt[(PIC_1_OFFSET + 2) as usize].set_handler_fn(irq2_stub);
        idt[(PIC_1_OFFSET + 3) as usize].set_handler_fn(irq3_stub);
        idt[(PIC_1_OFFSET + 4) as usize].set_handler_fn(irq4_stub);
        idt[(PIC_1_OFFSET + 5) as usize].set_handler_fn(irq5_stub);
        idt[(PIC_1_OFFSET + 6) as usize].set_handler_fn(irq6_stub);
        idt[(PIC_1_OFFSET + 7) as usize].set_handler_fn(irq7_stub);
        idt[(PIC_1_OFFSET + 8) as usize].set_handler_fn(irq8_stub);
        idt[(PIC_1_OFFSET + 9) as usize].set_handler_fn(irq9_stub);
        idt[(PIC_1_OFFSET + 10) as usize].set_handler_fn(irq10_stub);
        idt[(PIC_1_OFFSET + 11) as usize].set_handler_fn(irq11_stub);
        idt[(PIC_1_OFFSET + 12) as usize].set_handler_fn(irq12_stub);
        idt[(PIC_1_OFFSET + 13) as usize].set_handler_fn(irq13_stub);
        idt[(PIC_1_OFFSET + 14) as usize].set_handler_fn(irq14_stub);
        idt[(PIC_1_OFFSET + 15) as usize].set_handler_fn(irq15_stub);

        idt
    };
}

/// Load the IDT into the CPU.
pub fn init() {
    IDT.load();
}
